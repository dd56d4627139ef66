//! Configuration module for DriftSync.
//!
//! Provides typed configuration structs that map to the YAML configuration
//! file, with loading, validation, and defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Top-level configuration for DriftSync.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub queue: QueueConfig,
    pub conflicts: ConflictsConfig,
    pub logging: LoggingConfig,
}

/// Offline queue settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Maximum number of operations held in the queue, completed items
    /// included until explicitly cleared.
    pub max_queue_size: usize,
    /// Default attempt budget per operation.
    pub max_retries: u32,
    /// Whether enqueues and connectivity transitions schedule automatic
    /// drains. Disable for deterministic single-stepping.
    pub auto_drain: bool,
    /// Path of the persisted queue snapshot.
    pub storage_path: PathBuf,
}

/// Conflict resolution settings.
///
/// Each entry overrides or extends the registry's built-in per-type
/// policies. Invalid entries are logged and skipped at registry build
/// time, never fatal.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConflictsConfig {
    /// Per-document-type policy overrides.
    #[serde(default)]
    pub policies: Vec<TypePolicy>,
}

/// A single per-type policy override from configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypePolicy {
    /// Document type tag the policy applies to (e.g. `quiz`).
    pub document_type: String,
    /// Strategy name: `last-write-wins`, `first-write-wins`,
    /// `auto-merge`, or `manual`.
    pub strategy: String,
    /// Fields eligible for silent reconciliation under `auto-merge`.
    #[serde(default)]
    pub auto_merge_fields: Vec<String>,
    /// Name of the last-modified field. Defaults to `updatedAt`.
    #[serde(default = "default_timestamp_field")]
    pub timestamp_field: String,
}

fn default_timestamp_field() -> String {
    "updatedAt".to_string()
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
    /// Optional log file; stderr when absent.
    pub file: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/driftsync/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("driftsync")
            .join("config.yaml")
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_queue_size: 100,
            max_retries: 3,
            auto_drain: true,
            storage_path: dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("driftsync")
                .join("queue.json"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}
