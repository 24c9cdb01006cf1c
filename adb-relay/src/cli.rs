// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use {
    adbrelaylib::{
        agent::Agent,
        config::{AgentConfig, RoomHashStore},
        logging,
    },
    anyhow::{Context, Result},
    clap::{value_parser, Arg, ArgAction, ArgMatches, Command},
    std::path::PathBuf,
};

const ABOUT: &str = "\
Relay adb commands from a control server to attached Android devices.

The agent is bound to a room hash. On first start the room hash is read
from the terminal and saved next to the executable (see --config-file).
Later starts reuse the saved value. Pass --room-hash to replace it.

While running, the agent:

* reports attached devices to the control server every few seconds,
* polls the server for commands queued for the room,
* keeps game sessions running per device, relaunching them when they exit,
* runs other commands concurrently and prints a success/failure summary,
* appends the output of failed commands to the error log.

Press Ctrl+C to stop. Running game sessions are terminated on exit.
";

fn command() -> Command {
    let defaults = AgentConfig::default();

    Command::new("adb-relay")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Relay adb commands from a control server to Android devices")
        .long_about(ABOUT)
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::Count)
                .help("Increase logging verbosity. Can be specified multiple times"),
        )
        .arg(
            Arg::new("server_url")
                .long("server-url")
                .value_name("URL")
                .default_value(defaults.server_url)
                .help("Base URL of the control server"),
        )
        .arg(
            Arg::new("room_hash")
                .long("room-hash")
                .value_name("HASH")
                .help("Room hash to use and save instead of the saved one"),
        )
        .arg(
            Arg::new("config_file")
                .long("config-file")
                .value_name("PATH")
                .value_parser(value_parser!(PathBuf))
                .default_value(defaults.room_hash_path.into_os_string())
                .help("File the room hash is saved in"),
        )
        .arg(
            Arg::new("error_log")
                .long("error-log")
                .value_name("PATH")
                .value_parser(value_parser!(PathBuf))
                .default_value(defaults.error_log_path.into_os_string())
                .help("File the output of failed commands is appended to"),
        )
        .arg(
            Arg::new("adb")
                .long("adb")
                .value_name("PATH")
                .value_parser(value_parser!(PathBuf))
                .default_value(defaults.adb_program.into_os_string())
                .help("adb executable to run"),
        )
        .arg(
            Arg::new("adb_arg")
                .long("adb-arg")
                .value_name("ARG")
                .action(ArgAction::Append)
                .allow_hyphen_values(true)
                .help("Global option passed to every adb invocation (e.g. -H host)"),
        )
}

fn config_from_args(args: &ArgMatches) -> AgentConfig {
    let mut config = AgentConfig::default();

    if let Some(url) = args.get_one::<String>("server_url") {
        config.server_url = url.clone();
    }
    if let Some(path) = args.get_one::<PathBuf>("config_file") {
        config.room_hash_path = path.clone();
    }
    if let Some(path) = args.get_one::<PathBuf>("error_log") {
        config.error_log_path = path.clone();
    }
    if let Some(path) = args.get_one::<PathBuf>("adb") {
        config.adb_program = path.clone();
    }
    if let Some(values) = args.get_many::<String>("adb_arg") {
        config.adb_args = values.cloned().collect();
    }

    config
}

fn resolve_room_hash(config: &AgentConfig, explicit: Option<&String>) -> Result<String> {
    let store = RoomHashStore::new(&config.room_hash_path);

    match explicit.map(|s| s.trim()).filter(|s| !s.is_empty()) {
        Some(room_hash) => {
            store
                .save(room_hash)
                .with_context(|| format!("saving room hash to {}", store.path().display()))?;
            Ok(room_hash.to_string())
        }
        None => {
            let stdin = std::io::stdin();
            let mut input = stdin.lock();
            let mut output = std::io::stdout();

            store
                .load_or_prompt(&mut input, &mut output)
                .context("resolving room hash")
        }
    }
}

pub async fn run_cli() -> Result<()> {
    let matches = command().get_matches();

    logging::init(matches.get_count("verbose"));

    let config = config_from_args(&matches);
    let room_hash = resolve_room_hash(&config, matches.get_one::<String>("room_hash"))?;

    Agent::new(config, room_hash)
        .run()
        .await
        .context("running relay agent")
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn verify_cli() {
        command().debug_assert();
    }

    #[test]
    fn overrides() -> Result<()> {
        let matches = command().try_get_matches_from([
            "adb-relay",
            "--server-url",
            "http://localhost:8000",
            "--config-file",
            "/tmp/room.txt",
            "--adb",
            "/opt/platform-tools/adb",
            "--adb-arg",
            "-H",
            "--adb-arg",
            "10.0.0.2",
            "-vv",
        ])?;

        let config = config_from_args(&matches);
        assert_eq!(config.server_url, "http://localhost:8000");
        assert_eq!(config.room_hash_path, PathBuf::from("/tmp/room.txt"));
        assert_eq!(config.adb_program, PathBuf::from("/opt/platform-tools/adb"));
        assert_eq!(config.adb_args, vec!["-H".to_string(), "10.0.0.2".to_string()]);
        assert_eq!(matches.get_count("verbose"), 2);

        Ok(())
    }

    #[test]
    fn explicit_room_hash_is_saved() -> Result<()> {
        let td = tempfile::tempdir()?;
        let config = AgentConfig {
            room_hash_path: td.path().join("config.txt"),
            ..AgentConfig::default()
        };

        let hash = resolve_room_hash(&config, Some(&" room-9 ".to_string()))?;
        assert_eq!(hash, "room-9");
        assert_eq!(std::fs::read_to_string(td.path().join("config.txt"))?, "room-9");

        Ok(())
    }
}
