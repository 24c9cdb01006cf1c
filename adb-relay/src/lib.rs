// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*!
Relay `adb` commands from a control server to attached Android devices.

An agent is bound to a *room hash*. It periodically reports the devices it
can see to the control server, polls the server for commands queued for
the room and runs them against the named devices with `adb`.

Commands fall into three groups (see [adb::CommandKind]):

* game starts, which become persistent per-device [sessions::GameSessions]
  that are relaunched whenever they exit,
* game stops, which tear the device's session down and then run once,
* everything else, which runs once per batch, concurrently, with failures
  appended to an [error_log::ErrorLog].
*/

pub mod adb;
pub mod agent;
pub mod api;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod error_log;
pub mod logging;
pub mod queue;
pub mod sessions;

#[cfg(test)]
mod testutil;
