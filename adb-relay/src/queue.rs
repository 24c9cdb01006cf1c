// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use {crate::adb::AdbCommand, tokio::sync::Mutex};

/// Commands fetched from the server and awaiting dispatch.
///
/// A new batch is only accepted once the previous one has been fully
/// dispatched and cleared.
#[derive(Debug, Default)]
pub struct CommandQueue {
    commands: Mutex<Vec<AdbCommand>>,
}

impl CommandQueue {
    /// Enqueue a batch if nothing is pending.
    ///
    /// Returns whether the batch was accepted.
    pub async fn offer(&self, batch: Vec<AdbCommand>) -> bool {
        if batch.is_empty() {
            return false;
        }

        let mut commands = self.commands.lock().await;
        if !commands.is_empty() {
            return false;
        }

        commands.extend(batch);

        true
    }

    /// Copy of the pending commands.
    pub async fn snapshot(&self) -> Vec<AdbCommand> {
        self.commands.lock().await.clone()
    }

    pub async fn clear(&self) {
        self.commands.lock().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.commands.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.commands.lock().await.is_empty()
    }
}
