// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*!
Execution of queued command batches.

Each batch is split by [CommandKind]. Start commands hand off to
[GameSessions], stop commands tear the device's session down before
running once, and everything else runs concurrently with the outcomes
summarized and failures written to the [ErrorLog].
*/

use {
    crate::{
        adb::{AdbCommand, AdbRunner, CommandKind, CommandOutcome},
        error_log::{timestamp, ErrorLog},
        queue::CommandQueue,
        sessions::GameSessions,
    },
    log::{debug, warn},
    std::{sync::Arc, time::Duration},
    tokio::{sync::watch, task::JoinSet},
};

/// Outcome counts of the one-shot commands in a batch.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct BatchSummary {
    pub success: usize,
    pub fail: usize,
    pub failures: Vec<CommandOutcome>,
}

impl BatchSummary {
    fn from_outcomes(outcomes: Vec<CommandOutcome>) -> Self {
        let (ok, failures): (Vec<_>, Vec<_>) = outcomes.into_iter().partition(|o| o.success());

        Self {
            success: ok.len(),
            fail: failures.len(),
            failures,
        }
    }

    /// The console line announcing this summary.
    pub fn line(&self, timestamp: &str) -> String {
        format!(
            "[SUMMARY] {} : success={} fail={}",
            timestamp, self.success, self.fail
        )
    }
}

/// Drains the [CommandQueue] and executes its commands.
pub struct Dispatcher {
    queue: Arc<CommandQueue>,
    sessions: Arc<GameSessions>,
    runner: AdbRunner,
    error_log: ErrorLog,
}

impl Dispatcher {
    pub fn new(
        queue: Arc<CommandQueue>,
        sessions: Arc<GameSessions>,
        runner: AdbRunner,
        error_log: ErrorLog,
    ) -> Self {
        Self {
            queue,
            sessions,
            runner,
            error_log,
        }
    }

    /// Execute a batch of commands.
    ///
    /// Returns a summary if the batch contained one-shot commands.
    pub async fn dispatch_batch(&self, batch: Vec<AdbCommand>) -> Option<BatchSummary> {
        let mut starts = vec![];
        let mut stops = vec![];
        let mut regular = vec![];

        for command in batch {
            if command.serial.is_empty() || command.command_text.is_empty() {
                continue;
            }

            match command.kind() {
                CommandKind::StartGame => starts.push(command),
                CommandKind::StopGame => stops.push(command),
                CommandKind::Regular => regular.push(command),
            }
        }

        for command in &starts {
            if self.sessions.start(command).await {
                debug!("{}: game session started", command.serial);
            }
        }

        for command in &stops {
            self.sessions.stop(&command.serial).await;
            let outcome = self.runner.run_once(command).await;
            debug!("{}: stop command exited {}", command.serial, outcome.code);
        }

        if regular.is_empty() {
            return None;
        }

        let mut tasks = JoinSet::new();
        for command in regular {
            let runner = self.runner.clone();
            tasks.spawn(async move { runner.run_once(&command).await });
        }

        let mut outcomes = vec![];
        while let Some(res) = tasks.join_next().await {
            match res {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => warn!("command task failed: {}", e),
            }
        }

        let summary = BatchSummary::from_outcomes(outcomes);

        println!("{}", summary.line(&timestamp()));

        for outcome in &summary.failures {
            self.error_log.append(&outcome.serial, &outcome.error_text());
        }

        Some(summary)
    }

    /// Dispatch queued batches until told to stop.
    pub async fn run(self, interval: Duration, mut stop: watch::Receiver<bool>) {
        while !*stop.borrow() {
            let batch = self.queue.snapshot().await;

            if !batch.is_empty() {
                self.dispatch_batch(batch).await;
                self.queue.clear().await;
            }

            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = stop.changed() => break,
            }
        }
    }
}
