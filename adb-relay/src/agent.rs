// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*!
The relay agent.

The agent runs a handful of background loops sharing a stop signal:

* a reporter announcing attached devices to the control server,
* a fetcher polling the server for queued commands,
* the [Dispatcher] executing queued commands,
* a status monitor,
* a console clearer.
*/

use {
    crate::{
        adb::AdbRunner,
        api::ApiClient,
        config::AgentConfig,
        dispatch::Dispatcher,
        error::{RelayError, Result},
        error_log::ErrorLog,
        queue::CommandQueue,
        sessions::GameSessions,
    },
    log::{debug, warn},
    std::{future::Future, io::Write, sync::Arc, time::Duration},
    tokio::{sync::watch, task::JoinSet},
};

/// Sleep for `duration` unless stopped first.
///
/// Returns true if the stop signal fired.
async fn wait_or_stop(stop: &mut watch::Receiver<bool>, duration: Duration) -> bool {
    if *stop.borrow() {
        return true;
    }

    tokio::select! {
        _ = tokio::time::sleep(duration) => false,
        _ = stop.changed() => true,
    }
}

async fn report_loop(
    client: Arc<ApiClient>,
    runner: AdbRunner,
    room_hash: String,
    interval: Duration,
    mut stop: watch::Receiver<bool>,
) {
    loop {
        let devices = match runner.list_devices().await {
            Ok(devices) => devices,
            Err(e) => {
                debug!("listing devices: {}", e);
                vec![]
            }
        };

        if let Err(e) = client.report_devices(&room_hash, &devices).await {
            warn!("[report err] {}", e);
        }

        if wait_or_stop(&mut stop, interval).await {
            break;
        }
    }
}

async fn fetch_loop(
    client: Arc<ApiClient>,
    queue: Arc<CommandQueue>,
    room_hash: String,
    interval: Duration,
    mut stop: watch::Receiver<bool>,
) {
    loop {
        match client.fetch_commands(&room_hash).await {
            Ok(commands) => {
                let count = commands.len();
                if queue.offer(commands).await {
                    debug!("queued {} commands", count);
                }
            }
            Err(RelayError::UnexpectedStatus(status, _)) => {
                warn!("[fetch warn] HTTP {}", status);
            }
            Err(e) => {
                warn!("[fetch err] {}", e);
            }
        }

        if wait_or_stop(&mut stop, interval).await {
            break;
        }
    }
}

fn status_line(tasks: usize, processes: usize) -> String {
    format!("[STATUS] tasks={} processes={}", tasks, processes)
}

async fn status_loop(
    sessions: Arc<GameSessions>,
    interval: Duration,
    mut stop: watch::Receiver<bool>,
) {
    loop {
        let tasks = tokio::runtime::Handle::current()
            .metrics()
            .num_alive_tasks();
        let processes = sessions.running_processes().await;

        println!("{}", status_line(tasks, processes));

        if wait_or_stop(&mut stop, interval).await {
            break;
        }
    }
}

async fn clear_loop(interval: Duration, mut stop: watch::Receiver<bool>) {
    while !wait_or_stop(&mut stop, interval).await {
        let mut stdout = std::io::stdout();
        // Erase the display and home the cursor.
        if let Err(e) = stdout
            .write_all(b"\x1b[2J\x1b[1;1H")
            .and_then(|_| stdout.flush())
        {
            debug!("clearing console: {}", e);
        }
    }
}

/// A configured relay agent bound to a room.
pub struct Agent {
    config: AgentConfig,
    room_hash: String,
}

impl Agent {
    pub fn new(config: AgentConfig, room_hash: impl ToString) -> Self {
        Self {
            config,
            room_hash: room_hash.to_string(),
        }
    }

    pub fn room_hash(&self) -> &str {
        &self.room_hash
    }

    /// Run until Ctrl+C is received.
    pub async fn run(self) -> Result<()> {
        self.run_until(tokio::signal::ctrl_c()).await
    }

    /// Run until `shutdown` resolves.
    ///
    /// All background loops are stopped and every game session is torn
    /// down before returning.
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = std::io::Result<()>>,
    {
        let config = self.config;

        let client = Arc::new(ApiClient::new(
            config.server_url.as_str(),
            config.http_timeout,
        )?);
        let runner = AdbRunner::new(&config.adb_program).with_global_args(&config.adb_args);
        let queue = Arc::new(CommandQueue::default());
        let sessions = Arc::new(GameSessions::new(
            runner.clone(),
            config.session_restart_delay,
            config.session_stop_grace,
        ));
        let dispatcher = Dispatcher::new(
            queue.clone(),
            sessions.clone(),
            runner.clone(),
            ErrorLog::new(&config.error_log_path),
        );

        println!("Room hash: {}", self.room_hash);

        let (stop, stop_rx) = watch::channel(false);
        let mut tasks = JoinSet::new();

        tasks.spawn(report_loop(
            client.clone(),
            runner,
            self.room_hash.clone(),
            config.report_interval,
            stop_rx.clone(),
        ));
        tasks.spawn(fetch_loop(
            client,
            queue,
            self.room_hash.clone(),
            config.fetch_interval,
            stop_rx.clone(),
        ));
        tasks.spawn(dispatcher.run(config.dispatch_interval, stop_rx.clone()));
        tasks.spawn(status_loop(
            sessions.clone(),
            config.status_interval,
            stop_rx.clone(),
        ));
        tasks.spawn(clear_loop(config.clear_interval, stop_rx));

        println!("Background tasks running. Press Ctrl+C to stop.");

        let res = shutdown.await;

        println!("\nStopping...");
        stop.send_replace(true);
        // The dispatcher must be gone before sessions are collected, or it
        // could start one nobody stops.
        tasks.shutdown().await;
        sessions.stop_all().await;

        Ok(res?)
    }
}
