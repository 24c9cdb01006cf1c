// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use log::LevelFilter;

/// Resolve the default log level from a `-v` occurrence count.
pub fn level_from_verbosity(occurrences: u8) -> LevelFilter {
    match occurrences {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Install the global logger.
///
/// `RUST_LOG` takes precedence over the verbosity-derived level.
pub fn init(occurrences: u8) {
    let log_level = level_from_verbosity(occurrences);

    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(log_level.as_str()),
    );

    // Disable log context except at higher log levels.
    if log_level <= LevelFilter::Info {
        builder
            .format_timestamp(None)
            .format_level(false)
            .format_target(false);
    }

    // Connection chatter drowns out the agent's own output.
    if log_level == LevelFilter::Info {
        builder
            .filter_module("rustls", LevelFilter::Error)
            .filter_module("hyper", LevelFilter::Error)
            .filter_module("reqwest", LevelFilter::Warn);
    }

    builder.init();
}
