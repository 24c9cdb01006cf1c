// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use {
    bundlelib::{BundleJob, BundleOutcome},
    clap::Command,
    log::LevelFilter,
};

const ABOUT: &str = "\
Package the relay entry point into a single-file executable.

Runs the packaging tool with a clean, single-file build of a fixed entry
point. On success the path of the produced executable is printed. On
failure the tool's exit status is forwarded and nothing is printed.

Set RUST_LOG=debug to see the exact tool invocation.
";

fn main() {
    Command::new("bundle")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Package the relay entry point into a single-file executable")
        .long_about(ABOUT)
        .disable_help_flag(true)
        .disable_version_flag(true)
        .get_matches();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(LevelFilter::Warn.as_str()),
    )
    .format_timestamp(None)
    .format_target(false)
    .init();

    let job = BundleJob::default();

    std::process::exit(match job.run() {
        Ok(BundleOutcome::Built(path)) => {
            println!("Build complete: {}", path.display());
            0
        }
        Ok(outcome) => outcome.exit_code(),
        Err(err) => {
            eprintln!("error: {:?}", err);
            1
        }
    });
}
