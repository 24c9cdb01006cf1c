// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use {
    anyhow::Result,
    assert_cmd::Command,
    assert_fs::{prelude::*, TempDir},
    libtest_mimic::{Arguments, Trial},
    predicates::prelude::*,
};

/// Stand-in for PyInstaller.
///
/// Records its arguments, fails like the real tool when the entry point is
/// missing and otherwise exits with `$FAKE_STATUS`.
const FAKE_TOOL: &str = r#"#!/bin/sh
echo "$@" >> "$INVOCATIONS"
for last; do :; done
if [ ! -f "$last" ]; then
    echo "script '$last' not found" >&2
    exit 1
fi
exit "$FAKE_STATUS"
"#;

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new(with_entry_point: bool) -> Result<Self> {
        let dir = TempDir::new()?;

        dir.child("bin").create_dir_all()?;
        let tool = dir.child("bin").child("pyinstaller");
        tool.write_str(FAKE_TOOL)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(tool.path(), std::fs::Permissions::from_mode(0o755))?;
        }

        if with_entry_point {
            dir.child("main.py").write_str("print('hello')\n")?;
        }

        Ok(Self { dir })
    }

    fn command(&self, fake_status: i32) -> Result<Command> {
        let mut command = Command::cargo_bin("bundle")?;
        command
            .current_dir(self.dir.path())
            .env("PATH", self.dir.child("bin").path())
            .env("INVOCATIONS", self.dir.child("invocations.txt").path())
            .env("FAKE_STATUS", fake_status.to_string());

        Ok(command)
    }

    fn invocations(&self) -> Result<Vec<String>> {
        let path = self.dir.child("invocations.txt");
        if !path.path().exists() {
            return Ok(vec![]);
        }

        Ok(std::fs::read_to_string(path.path())?
            .lines()
            .map(|l| l.to_string())
            .collect())
    }
}

fn success_prints_confirmation() -> Result<()> {
    let ws = Workspace::new(true)?;

    ws.command(0)?
        .assert()
        .success()
        .stdout(predicate::str::diff("Build complete: dist/adb_relay\n"));

    assert_eq!(
        ws.invocations()?,
        vec!["--clean --onefile --name adb_relay main.py".to_string()]
    );

    Ok(())
}

fn failure_forwards_status() -> Result<()> {
    let ws = Workspace::new(true)?;

    ws.command(1)?
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Build complete").not());

    ws.command(42)?
        .assert()
        .code(42)
        .stdout(predicate::str::is_empty());

    Ok(())
}

fn missing_entry_point_fails() -> Result<()> {
    let ws = Workspace::new(false)?;

    ws.command(0)?
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("not found"));

    Ok(())
}

fn missing_tool_is_command_not_found() -> Result<()> {
    let ws = Workspace::new(true)?;

    ws.command(0)?
        .env("PATH", ws.dir.child("empty").path())
        .assert()
        .code(127)
        .stdout(predicate::str::is_empty());

    Ok(())
}

fn repeated_runs_rebuild() -> Result<()> {
    let ws = Workspace::new(true)?;

    ws.command(0)?.assert().success();
    ws.command(0)?.assert().success();

    assert_eq!(ws.invocations()?.len(), 2);

    Ok(())
}

fn rejects_arguments() -> Result<()> {
    let ws = Workspace::new(true)?;

    for arg in ["extra", "--help", "-h", "--version", "-V"] {
        ws.command(0)?
            .arg(arg)
            .assert()
            .failure()
            .stdout(predicate::str::is_empty());
    }
    assert!(ws.invocations()?.is_empty());

    Ok(())
}

fn main() {
    let mut args = Arguments::from_args();
    // The fake tool is written and then executed; keep that away from
    // concurrent forks.
    args.test_threads = Some(1);

    let tests: Vec<(&str, fn() -> Result<()>)> = vec![
        ("success_prints_confirmation", success_prints_confirmation),
        ("failure_forwards_status", failure_forwards_status),
        ("missing_entry_point_fails", missing_entry_point_fails),
        ("missing_tool_is_command_not_found", missing_tool_is_command_not_found),
        ("repeated_runs_rebuild", repeated_runs_rebuild),
        ("rejects_arguments", rejects_arguments),
    ];

    let trials = tests
        .into_iter()
        .map(|(name, f)| {
            Trial::test(name, move || f().map_err(Into::into)).with_ignored_flag(!cfg!(unix))
        })
        .collect();

    libtest_mimic::run(&args, trials).exit();
}
