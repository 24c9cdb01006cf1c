// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Running `adb` against individual devices. */

use {
    crate::error::{RelayError, Result},
    log::debug,
    std::{
        ffi::OsString,
        path::{Path, PathBuf},
        process::Stdio,
    },
    tokio::process::Command,
};

/// Marker of the instrumentation run that drives a game session.
pub const START_GAME_MARKER: &str = "nat.myc.test/androidx.test.runner.AndroidJUnitRunner";

/// Marker of the command that stops a game session.
pub const STOP_GAME_MARKER: &str = "force-stop nat.myc.test";

/// A command queued by the control server for one device.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AdbCommand {
    pub serial: String,
    pub command_text: String,
}

impl AdbCommand {
    pub fn new(serial: impl ToString, command_text: impl ToString) -> Self {
        Self {
            serial: serial.to_string(),
            command_text: command_text.to_string(),
        }
    }

    pub fn kind(&self) -> CommandKind {
        CommandKind::classify(&self.command_text)
    }
}

/// How a queued command is executed.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CommandKind {
    /// Runs persistently and is relaunched whenever it exits.
    StartGame,
    /// Tears down the device's game session, then runs once.
    StopGame,
    /// Runs once; the outcome counts towards the batch summary.
    Regular,
}

impl CommandKind {
    pub fn classify(command_text: &str) -> Self {
        if command_text.contains(START_GAME_MARKER) {
            Self::StartGame
        } else if command_text.contains(STOP_GAME_MARKER) {
            Self::StopGame
        } else {
            Self::Regular
        }
    }
}

/// Result of running a command to completion.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommandOutcome {
    pub serial: String,
    /// Exit code, or -1 if the process could not be run or had no code.
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutcome {
    pub fn success(&self) -> bool {
        self.code == 0
    }

    /// Text worth recording when the command failed.
    pub fn error_text(&self) -> String {
        if !self.stderr.is_empty() {
            self.stderr.clone()
        } else if !self.stdout.is_empty() {
            self.stdout.clone()
        } else {
            format!("exit_code={}", self.code)
        }
    }
}

/// A device as listed by `adb devices`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Device {
    pub serial: String,
    /// Connection state, e.g. `device`, `offline` or `unauthorized`.
    pub state: String,
}

/// Parse the output of `adb devices`.
pub fn parse_devices(output: &str) -> Vec<Device> {
    output
        .lines()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .filter(|line| !line.starts_with("List of devices") && !line.starts_with('*'))
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let serial = parts.next()?;
            let state = parts.next()?;

            Some(Device {
                serial: serial.to_string(),
                state: state.to_string(),
            })
        })
        .collect()
}

/// Runs `adb` invocations.
#[derive(Clone, Debug)]
pub struct AdbRunner {
    program: PathBuf,
    /// Global options placed before the device selector, e.g. `-H host`.
    global_args: Vec<OsString>,
}

impl Default for AdbRunner {
    fn default() -> Self {
        Self::new("adb")
    }
}

impl AdbRunner {
    pub fn new(program: impl AsRef<Path>) -> Self {
        Self {
            program: program.as_ref().to_path_buf(),
            global_args: vec![],
        }
    }

    pub fn with_global_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.global_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Full argument vector for a command, program included.
    ///
    /// The command text is split with POSIX shell quoting rules.
    pub fn argv(&self, command: &AdbCommand) -> Result<Vec<OsString>> {
        let words = shlex::split(&command.command_text)
            .ok_or_else(|| RelayError::CommandSplit(command.command_text.clone()))?;

        let mut argv = vec![self.program.clone().into_os_string()];
        argv.extend(self.global_args.iter().cloned());
        argv.push(OsString::from("-s"));
        argv.push(OsString::from(&command.serial));
        argv.extend(words.into_iter().map(OsString::from));

        Ok(argv)
    }

    /// Construct a process for a command without starting it.
    pub fn command(&self, command: &AdbCommand) -> Result<Command> {
        let argv = self.argv(command)?;

        let mut cmd = Command::new(&argv[0]);
        cmd.args(&argv[1..]).stdin(Stdio::null());

        Ok(cmd)
    }

    /// Run a command to completion and capture its output.
    ///
    /// Never fails: problems launching the process are reported in the
    /// outcome with code -1.
    pub async fn run_once(&self, command: &AdbCommand) -> CommandOutcome {
        debug!("{}: running {}", command.serial, command.command_text);

        let output = match self.command(command) {
            Ok(mut cmd) => cmd.output().await.map_err(RelayError::from),
            Err(e) => Err(e),
        };

        match output {
            Ok(output) => CommandOutcome {
                serial: command.serial.clone(),
                code: output.status.code().unwrap_or(-1),
                stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            },
            Err(e) => CommandOutcome {
                serial: command.serial.clone(),
                code: -1,
                stdout: String::new(),
                stderr: e.to_string(),
            },
        }
    }

    /// List attached devices.
    pub async fn list_devices(&self) -> Result<Vec<Device>> {
        let output = Command::new(&self.program)
            .args(&self.global_args)
            .arg("devices")
            .stdin(Stdio::null())
            .output()
            .await?;

        if !output.status.success() {
            return Err(RelayError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!(
                    "adb devices failed: {}",
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            )));
        }

        Ok(parse_devices(&String::from_utf8_lossy(&output.stdout)))
    }
}
