//! Log subscriber setup.

use crate::config::LoggingConfig;
use crate::error::{Result, TrackerError};
use std::fs::{self, OpenOptions};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const LOG_FILE: &str = "inventory_tracker.log";

/// Build the filter for a configured level.
///
/// A non-empty `RUST_LOG` takes precedence over the configured level.
pub fn env_filter(config: &LoggingConfig) -> EnvFilter {
    let default_directive = format!("inventory_tracker={}", config.level.to_ascii_lowercase());
    let directive = std::env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);
    EnvFilter::new(directive)
}

/// Install a global fmt subscriber.
///
/// Writes to stderr, or appends to `inventory_tracker.log` under `log_path`
/// when one is configured. Fails if a subscriber has already been installed
/// for the process.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let builder = tracing_subscriber::fmt().with_env_filter(env_filter(config));

    let installed = match &config.log_path {
        Some(dir) => {
            fs::create_dir_all(dir)?;
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(dir.join(LOG_FILE))?;
            let builder = builder.with_writer(Arc::new(file)).with_ansi(false);
            if config.json {
                builder.json().try_init()
            } else {
                builder.try_init()
            }
        }
        None if config.json => builder.json().try_init(),
        None => builder.try_init(),
    };
    installed.map_err(|e| TrackerError::Config(format!("failed to install log subscriber: {}", e)))
}
