// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! HTTP client for the control server. */

use {
    crate::{
        adb::{AdbCommand, Device},
        error::{RelayError, Result},
    },
    reqwest::{Client, ClientBuilder, IntoUrl, StatusCode, Url},
    serde::{Deserialize, Serialize},
    std::time::Duration,
};

/// Default HTTP user agent string.
pub const USER_AGENT: &str = concat!("adb-relay/", env!("CARGO_PKG_VERSION"));

/// A device entry in a report.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct DeviceReport {
    pub serial: String,
    pub data: serde_json::Map<String, serde_json::Value>,
    pub status: String,
    pub device_type: String,
}

impl From<&Device> for DeviceReport {
    fn from(device: &Device) -> Self {
        Self {
            serial: device.serial.clone(),
            data: serde_json::Map::new(),
            status: if device.state == "device" {
                "active".to_string()
            } else {
                device.state.clone()
            },
            device_type: "android".to_string(),
        }
    }
}

/// Body of a device report.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ReportRequest<'a> {
    pub room_hash: &'a str,
    pub devices: Vec<DeviceReport>,
}

#[derive(Debug, Default, Deserialize)]
struct SubscribeResponse {
    #[serde(default)]
    commands: Option<Vec<QueuedCommand>>,
}

#[derive(Debug, Default, Deserialize)]
struct QueuedCommand {
    #[serde(default)]
    command_text: Option<String>,
    #[serde(default)]
    serial: Option<String>,
}

/// Extract runnable commands from a subscribe response body.
///
/// Entries lacking a serial or command text are dropped.
pub fn parse_commands(body: &[u8]) -> Result<Vec<AdbCommand>> {
    let response: SubscribeResponse = serde_json::from_slice(body)?;

    Ok(response
        .commands
        .unwrap_or_default()
        .into_iter()
        .filter_map(|c| match (c.serial, c.command_text) {
            (Some(serial), Some(text)) if !serial.is_empty() && !text.is_empty() => {
                Some(AdbCommand::new(serial, text))
            }
            _ => None,
        })
        .collect())
}

/// Client for the control server.
///
/// Instances are bound to a base URL.
#[derive(Debug)]
pub struct ApiClient {
    client: Client,
    root_url: Url,
}

impl ApiClient {
    /// Construct an instance bound to the specified URL.
    pub fn new(url: impl IntoUrl, timeout: Duration) -> Result<Self> {
        let builder = ClientBuilder::new()
            .user_agent(USER_AGENT)
            .timeout(timeout);

        Self::new_client(builder.build()?, url)
    }

    pub fn new_client(client: Client, url: impl IntoUrl) -> Result<Self> {
        let mut root_url = url.into_url()?;

        if root_url.cannot_be_a_base() {
            return Err(RelayError::UrlParse(url::ParseError::RelativeUrlWithCannotBeABaseBase));
        }

        // Trailing slashes are significant to Url::join().
        if !root_url.path().ends_with('/') {
            root_url.set_path(&format!("{}/", root_url.path()));
        }

        Ok(Self { client, root_url })
    }

    pub fn report_url(&self) -> Result<Url> {
        Ok(self.root_url.join("api/v1/report-devices")?)
    }

    pub fn subscribe_url(&self, room_hash: &str) -> Result<Url> {
        let mut url = self.root_url.join("api/v1/subscribe/")?;
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(room_hash);
        }

        Ok(url)
    }

    /// Tell the server which devices this agent is serving.
    pub async fn report_devices(&self, room_hash: &str, devices: &[Device]) -> Result<()> {
        let url = self.report_url()?;
        let body = ReportRequest {
            room_hash,
            devices: devices.iter().map(DeviceReport::from).collect(),
        };

        self.client.post(url).json(&body).send().await?;

        Ok(())
    }

    /// Fetch commands queued for this room.
    pub async fn fetch_commands(&self, room_hash: &str) -> Result<Vec<AdbCommand>> {
        let url = self.subscribe_url(room_hash)?;
        let res = self.client.get(url.clone()).send().await?;

        if res.status() != StatusCode::OK {
            return Err(RelayError::UnexpectedStatus(
                res.status().as_u16(),
                url.to_string(),
            ));
        }

        parse_commands(&res.bytes().await?)
    }
}
