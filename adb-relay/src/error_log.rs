// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use {
    log::debug,
    std::{
        io::Write,
        path::{Path, PathBuf},
    },
};

/// Format used for timestamps in operator-facing output.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Current local time rendered with [TIMESTAMP_FORMAT].
pub fn timestamp() -> String {
    chrono::Local::now().format(TIMESTAMP_FORMAT).to_string()
}

/// Append-only log of failed device commands.
#[derive(Clone, Debug)]
pub struct ErrorLog {
    path: PathBuf,
}

impl ErrorLog {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record a failure for a device.
    ///
    /// Failing to write is not an error for the caller.
    pub fn append(&self, serial: &str, message: &str) {
        let line = format!("{}   {}   :   {}\n", timestamp(), serial, message);

        let res = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut fh| fh.write_all(line.as_bytes()));

        if let Err(e) = res {
            debug!("unable to write {}: {}", self.path.display(), e);
        }
    }
}
