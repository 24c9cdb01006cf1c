// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*!
Package the relay entry point into a single-file executable.

This is a thin wrapper around PyInstaller. We ask it for a clean,
single-file build of a fixed entry point under a fixed name and forward
its exit status when it fails. There is no caching: every call re-runs
the tool.
*/

use {
    anyhow::{Context, Result},
    duct::cmd,
    log::debug,
    std::{
        ffi::OsString,
        path::{Path, PathBuf},
        process::ExitStatus,
    },
};

/// Program invoked to do the packaging. Resolved via `PATH`.
pub const PACKAGING_TOOL: &str = "pyinstaller";

/// Source file used as the program entry point.
pub const ENTRY_POINT: &str = "main.py";

/// Base name of the produced executable.
pub const OUTPUT_NAME: &str = "adb_relay";

/// Directory the packaging tool writes finished executables to.
pub const DIST_DIR: &str = "dist";

/// Exit status a shell reports when a command cannot be found.
pub const EXIT_COMMAND_NOT_FOUND: i32 = 127;

/// Result of a packaging run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum BundleOutcome {
    /// The tool succeeded. Holds the conventional path of the executable.
    Built(PathBuf),

    /// The tool failed with the given exit status.
    ToolFailed(i32),
}

impl BundleOutcome {
    /// Exit status the calling process should terminate with.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Built(_) => 0,
            Self::ToolFailed(code) => *code,
        }
    }
}

/// A single invocation of the packaging tool.
#[derive(Clone, Debug)]
pub struct BundleJob {
    pub tool: OsString,
    pub entry_point: PathBuf,
    pub output_name: String,
    pub dist_dir: PathBuf,
}

impl Default for BundleJob {
    fn default() -> Self {
        Self {
            tool: OsString::from(PACKAGING_TOOL),
            entry_point: PathBuf::from(ENTRY_POINT),
            output_name: OUTPUT_NAME.to_string(),
            dist_dir: PathBuf::from(DIST_DIR),
        }
    }
}

impl BundleJob {
    /// Arguments passed to the packaging tool.
    ///
    /// Cleans prior build state, requests a single-file executable, names
    /// it and finally names the entry point.
    pub fn arguments(&self) -> Vec<OsString> {
        vec![
            "--clean".into(),
            "--onefile".into(),
            "--name".into(),
            self.output_name.clone().into(),
            self.entry_point.clone().into_os_string(),
        ]
    }

    /// Where the tool places the executable by convention.
    ///
    /// Any platform extension is the tool's business and is not appended.
    pub fn output_path(&self) -> PathBuf {
        self.dist_dir.join(&self.output_name)
    }

    /// Run the packaging tool in the current directory.
    pub fn run(&self) -> Result<BundleOutcome> {
        self.run_in(None)
    }

    /// Run the packaging tool, optionally from a specific directory.
    ///
    /// Blocks until the tool exits. Its output streams are inherited.
    pub fn run_in(&self, cwd: Option<&Path>) -> Result<BundleOutcome> {
        let args = self.arguments();
        debug!("invoking {:?} with {:?}", self.tool, args);

        let mut expression = cmd(&self.tool, &args).unchecked();
        if let Some(cwd) = cwd {
            expression = expression.dir(cwd);
        }

        let output = match expression.run() {
            Ok(output) => output,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                eprintln!("{}: command not found", self.tool.to_string_lossy());
                return Ok(BundleOutcome::ToolFailed(EXIT_COMMAND_NOT_FOUND));
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("invoking {}", self.tool.to_string_lossy())
                })
            }
        };

        Ok(if output.status.success() {
            BundleOutcome::Built(self.output_path())
        } else {
            BundleOutcome::ToolFailed(failure_code(output.status))
        })
    }
}

/// Resolve the exit status a failed tool run should be forwarded as.
fn failure_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;

        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    1
}
