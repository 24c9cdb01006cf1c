// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Error type for this crate.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("URL parse error: {0:?}")]
    UrlParse(#[from] url::ParseError),

    #[error("HTTP error: {0:?}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0:?}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0:?}")]
    Io(#[from] std::io::Error),

    #[error("I/O error on path {0}: {1:?}")]
    IoPath(String, std::io::Error),

    #[error("unexpected HTTP status {0} from {1}")]
    UnexpectedStatus(u16, String),

    #[error("unbalanced quoting in command: {0}")]
    CommandSplit(String),

    #[error("input ended before a room hash was entered")]
    RoomHashMissing,
}

/// Result type for this crate.
pub type Result<T> = std::result::Result<T, RelayError>;
