//! Logging setup
//!
//! Initializes the global `tracing` subscriber from [`LoggingConfig`].
//! `RUST_LOG` overrides the configured level when set.

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Initializes the global subscriber, ignoring double-init errors.
pub fn init(config: &LoggingConfig) {
    if let Err(err) = try_init(config) {
        eprintln!("driftsync: failed to initialize logging: {err:#}");
    }
}

/// Initializes the global subscriber.
///
/// Errors if a subscriber is already installed or the log file cannot be
/// opened.
pub fn try_init(config: &LoggingConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.clone()));

    match &config.file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("create log directory {}", parent.display()))?;
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("open log file {}", path.display()))?;

            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(Arc::new(file))
                .with_ansi(false)
                .try_init()
                .map_err(|e| anyhow::anyhow!("install subscriber: {e}"))?;
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .try_init()
                .map_err(|e| anyhow::anyhow!("install subscriber: {e}"))?;
        }
    }

    Ok(())
}
