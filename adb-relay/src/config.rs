// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Agent settings and the persisted room hash. */

use {
    crate::error::{RelayError, Result},
    std::{
        io::{BufRead, Write},
        path::{Path, PathBuf},
        time::Duration,
    },
};

/// Control server the agent talks to unless told otherwise.
pub const DEFAULT_SERVER_URL: &str = "http://160.25.81.154:9000";

/// File name holding the room hash, next to the executable.
pub const ROOM_HASH_FILENAME: &str = "config.txt";

/// File name of the failed command log, next to the executable.
pub const ERROR_LOG_FILENAME: &str = "log_error.txt";

/// Runtime settings for the relay agent.
#[derive(Clone, Debug)]
pub struct AgentConfig {
    /// Base URL of the control server.
    pub server_url: String,
    /// Where the room hash is persisted.
    pub room_hash_path: PathBuf,
    /// Where failed command output is appended.
    pub error_log_path: PathBuf,
    /// Program used to talk to devices.
    pub adb_program: PathBuf,
    /// Global options passed to every adb invocation.
    pub adb_args: Vec<String>,

    pub report_interval: Duration,
    pub fetch_interval: Duration,
    pub dispatch_interval: Duration,
    pub status_interval: Duration,
    pub clear_interval: Duration,

    /// Timeout applied to every HTTP request.
    pub http_timeout: Duration,
    /// Delay before a game session is relaunched after its process exits.
    pub session_restart_delay: Duration,
    /// How long to wait for a game session to wind down when stopping it.
    pub session_stop_grace: Duration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        let base = executable_dir();

        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            room_hash_path: base.join(ROOM_HASH_FILENAME),
            error_log_path: base.join(ERROR_LOG_FILENAME),
            adb_program: PathBuf::from("adb"),
            adb_args: vec![],
            report_interval: Duration::from_secs(3),
            fetch_interval: Duration::from_secs(1),
            dispatch_interval: Duration::from_secs(1),
            status_interval: Duration::from_secs(3),
            clear_interval: Duration::from_secs(120),
            http_timeout: Duration::from_secs(5),
            session_restart_delay: Duration::from_secs(1),
            session_stop_grace: Duration::from_secs(5),
        }
    }
}

/// Directory holding the running executable, or the working directory.
fn executable_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|p| p.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Persists the room hash in a plain text file.
#[derive(Clone, Debug)]
pub struct RoomHashStore {
    path: PathBuf,
}

impl RoomHashStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read a previously saved room hash.
    ///
    /// Returns `None` if the file is absent or holds only whitespace.
    pub fn load(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let data = std::fs::read_to_string(&self.path)
            .map_err(|e| RelayError::IoPath(format!("{}", self.path.display()), e))?;
        let value = data.trim();

        Ok(if value.is_empty() {
            None
        } else {
            Some(value.to_string())
        })
    }

    pub fn save(&self, room_hash: &str) -> Result<()> {
        std::fs::write(&self.path, room_hash.as_bytes())
            .map_err(|e| RelayError::IoPath(format!("{}", self.path.display()), e))
    }

    /// Return the saved room hash, asking for one if none is saved.
    ///
    /// Empty answers are rejected until a non-empty one arrives. The answer
    /// is saved before it is returned.
    pub fn load_or_prompt(
        &self,
        input: &mut impl BufRead,
        output: &mut impl Write,
    ) -> Result<String> {
        if let Some(saved) = self.load()? {
            return Ok(saved);
        }

        let mut prompt = "Enter room hash: ";
        let room_hash = loop {
            output.write_all(prompt.as_bytes())?;
            output.flush()?;

            let mut line = String::new();
            if input.read_line(&mut line)? == 0 {
                return Err(RelayError::RoomHashMissing);
            }

            let value = line.trim();
            if !value.is_empty() {
                break value.to_string();
            }

            prompt = "Room hash cannot be empty. Enter room hash: ";
        };

        self.save(&room_hash)?;

        Ok(room_hash)
    }
}
