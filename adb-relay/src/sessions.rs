// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*!
Persistent per-device game sessions.

A game session keeps one command running on a device. Whenever the
process exits, or fails to launch, it is relaunched after a short delay.
This continues until the session is stopped.
*/

use {
    crate::adb::{AdbCommand, AdbRunner},
    log::{debug, warn},
    std::{
        collections::HashMap,
        process::Stdio,
        sync::{
            atomic::{AtomicBool, Ordering},
            Arc,
        },
        time::Duration,
    },
    tokio::{
        sync::{watch, Mutex},
        task::JoinHandle,
    },
};

struct Session {
    stop: watch::Sender<bool>,
    process_alive: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

/// Registry of game sessions keyed by device serial.
pub struct GameSessions {
    runner: AdbRunner,
    restart_delay: Duration,
    stop_grace: Duration,
    sessions: Mutex<HashMap<String, Session>>,
}

impl GameSessions {
    pub fn new(runner: AdbRunner, restart_delay: Duration, stop_grace: Duration) -> Self {
        Self {
            runner,
            restart_delay,
            stop_grace,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Start a session for the command's device.
    ///
    /// Does nothing and returns false if a live session already exists for
    /// that device or the command text cannot be parsed.
    pub async fn start(&self, command: &AdbCommand) -> bool {
        if let Err(e) = self.runner.argv(command) {
            warn!("{}: not starting game session: {}", command.serial, e);
            return false;
        }

        let mut sessions = self.sessions.lock().await;

        if let Some(session) = sessions.get(&command.serial) {
            if !session.task.is_finished() {
                return false;
            }
        }

        let (stop, stop_rx) = watch::channel(false);
        let process_alive = Arc::new(AtomicBool::new(false));

        let task = tokio::spawn(session_loop(
            self.runner.clone(),
            command.clone(),
            stop_rx,
            process_alive.clone(),
            self.restart_delay,
        ));

        sessions.insert(
            command.serial.clone(),
            Session {
                stop,
                process_alive,
                task,
            },
        );

        true
    }

    /// Stop the session for a device, killing its running process.
    ///
    /// Returns whether a session existed.
    pub async fn stop(&self, serial: &str) -> bool {
        let session = self.sessions.lock().await.remove(serial);

        let Some(mut session) = session else {
            return false;
        };

        session.stop.send_replace(true);

        if tokio::time::timeout(self.stop_grace, &mut session.task)
            .await
            .is_err()
        {
            warn!("{}: game session did not stop in time; aborting", serial);
            session.task.abort();
        }

        true
    }

    /// Stop every session.
    pub async fn stop_all(&self) {
        let serials = self
            .sessions
            .lock()
            .await
            .keys()
            .cloned()
            .collect::<Vec<_>>();

        for serial in serials {
            self.stop(&serial).await;
        }
    }

    /// Number of sessions whose process is currently running.
    pub async fn running_processes(&self) -> usize {
        self.sessions
            .lock()
            .await
            .values()
            .filter(|s| s.process_alive.load(Ordering::SeqCst))
            .count()
    }

    pub async fn contains(&self, serial: &str) -> bool {
        self.sessions.lock().await.contains_key(serial)
    }
}

async fn session_loop(
    runner: AdbRunner,
    command: AdbCommand,
    mut stop: watch::Receiver<bool>,
    process_alive: Arc<AtomicBool>,
    restart_delay: Duration,
) {
    while !*stop.borrow() {
        let mut cmd = match runner.command(&command) {
            Ok(cmd) => cmd,
            Err(e) => {
                warn!("{}: {}", command.serial, e);
                break;
            }
        };
        cmd.stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        match cmd.spawn() {
            Ok(mut child) => {
                process_alive.store(true, Ordering::SeqCst);

                let stopped = tokio::select! {
                    status = child.wait() => {
                        debug!("{}: game process exited: {:?}", command.serial, status);
                        false
                    }
                    _ = stop.changed() => {
                        if let Err(e) = child.kill().await {
                            debug!("{}: killing game process: {}", command.serial, e);
                        }
                        true
                    }
                };

                process_alive.store(false, Ordering::SeqCst);

                if stopped {
                    break;
                }
            }
            Err(e) => {
                debug!("{}: launching game process: {}", command.serial, e);
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(restart_delay) => {}
            _ = stop.changed() => break,
        }
    }
}

#[cfg(all(test, unix))]
mod test {
    use {super::*, crate::testutil::fake_adb_runner, std::path::Path};

    fn sessions(dir: &Path, restart_delay: Duration) -> std::io::Result<GameSessions> {
        Ok(GameSessions::new(
            fake_adb_runner(dir)?,
            restart_delay,
            Duration::from_secs(5),
        ))
    }

    async fn wait_for_running(sessions: &GameSessions, expected: usize) -> bool {
        for _ in 0..100 {
            if sessions.running_processes().await == expected {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        false
    }

    #[tokio::test]
    async fn start_and_stop() -> std::io::Result<()> {
        let td = tempfile::tempdir()?;
        let sessions = sessions(td.path(), Duration::from_secs(1))?;
        let command = AdbCommand::new("dev1", "sleep 30");

        assert!(sessions.start(&command).await);
        assert!(!sessions.start(&command).await);
        assert!(wait_for_running(&sessions, 1).await);

        assert!(sessions.stop("dev1").await);
        assert!(!sessions.contains("dev1").await);
        assert_eq!(sessions.running_processes().await, 0);
        assert!(!sessions.stop("dev1").await);

        Ok(())
    }

    #[tokio::test]
    async fn relaunches_after_exit() -> std::io::Result<()> {
        let td = tempfile::tempdir()?;
        let sessions = sessions(td.path(), Duration::from_millis(20))?;
        let marker = td.path().join("launches");

        let command = AdbCommand::new(
            "dev1",
            format!("sh -c 'echo x >> {}'", marker.display()),
        );
        assert!(sessions.start(&command).await);

        let mut launches = 0;
        for _ in 0..100 {
            launches = std::fs::read_to_string(&marker)
                .map(|s| s.lines().count())
                .unwrap_or(0);
            if launches >= 3 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(launches >= 3);

        sessions.stop_all().await;
        assert!(!sessions.contains("dev1").await);

        Ok(())
    }

    #[tokio::test]
    async fn rejects_unparseable_command() -> std::io::Result<()> {
        let td = tempfile::tempdir()?;
        let sessions = sessions(td.path(), Duration::from_secs(1))?;

        assert!(!sessions.start(&AdbCommand::new("dev1", "shell 'oops")).await);
        assert!(!sessions.contains("dev1").await);

        Ok(())
    }
}
