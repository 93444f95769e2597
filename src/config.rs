//! Tracker configuration.
//!
//! Configuration is a typed value passed explicitly to each component. It is
//! read from a TOML file with one table per section; every field has a
//! default, so a partial file (or none at all) is valid.

use crate::analysis::HighlightThreshold;
use crate::error::{Result, TrackerError};
use crate::scheduler::{Backoff, DailySchedule, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub database: DatabaseConfig,
    pub scheduler: SchedulerConfig,
    pub report: ReportConfig,
    pub ui: UiConfig,
    pub logging: LoggingConfig,
    pub storage: StorageConfig,
}

/// Supported SQL dialects of the inventory database.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseKind {
    #[default]
    Mysql,
    Mssql,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub kind: DatabaseKind,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,
    pub connection_timeout_secs: u64,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            kind: DatabaseKind::Mysql,
            host: "localhost".to_string(),
            port: 3306,
            username: String::new(),
            password: String::new(),
            database: "inventory".to_string(),
            connection_timeout_secs: 30,
            max_connections: 5,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Daily run time, `HH:MM` local time.
    pub query_time: String,
    pub retry_attempts: u32,
    /// Base wait between attempts; grows linearly with the attempt number.
    pub retry_interval_mins: u64,
    /// Snapshots older than this many days are purged after each run.
    pub max_data_age_days: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            query_time: "23:00".to_string(),
            retry_attempts: 3,
            retry_interval_mins: 10,
            max_data_age_days: 90,
        }
    }
}

impl SchedulerConfig {
    pub fn schedule(&self) -> Result<DailySchedule> {
        DailySchedule::parse(&self.query_time)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry_attempts,
            interval: Duration::from_secs(self.retry_interval_mins * 60),
            backoff: Backoff::Linear,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Excel,
    Csv,
    Json,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub highlight_threshold: f64,
    /// Default length of a trend report, in days.
    pub history_days: u32,
    pub default_export_format: ExportFormat,
    pub export_path: PathBuf,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            highlight_threshold: crate::analysis::DEFAULT_HIGHLIGHT_THRESHOLD,
            history_days: 30,
            default_export_format: ExportFormat::Excel,
            export_path: PathBuf::from("./reports"),
        }
    }
}

impl ReportConfig {
    pub fn threshold(&self) -> Result<HighlightThreshold> {
        HighlightThreshold::new(self.highlight_threshold)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub theme: String,
    pub language: String,
    pub refresh_interval_secs: u64,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            theme: "system".to_string(),
            language: "de".to_string(),
            refresh_interval_secs: 300,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// One of `trace`, `debug`, `info`, `warn`, `error`.
    pub level: String,
    /// Directory for `inventory_tracker.log`; logs go to stderr when unset.
    pub log_path: Option<PathBuf>,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_path: None,
            json: false,
        }
    }
}

/// On-disk encoding of snapshot payloads.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotEncoding {
    #[default]
    Json,
    Msgpack,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_path: PathBuf,
    /// Number of decoded snapshots kept in memory.
    pub snapshot_cache_size: usize,
    pub encoding: SnapshotEncoding,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("./data/inventory"),
            snapshot_cache_size: 16,
            encoding: SnapshotEncoding::Json,
        }
    }
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

impl TrackerConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TrackerConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            TrackerError::Config(format!(
                "failed to read {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    /// Load a configuration file, falling back to defaults if it does not exist.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            tracing::info!(path = %path.as_ref().display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Write the configuration as TOML, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Check values that serde alone cannot.
    pub fn validate(&self) -> Result<()> {
        if self.database.host.trim().is_empty() {
            return Err(TrackerError::Config("database.host must not be empty".into()));
        }
        if self.database.database.trim().is_empty() {
            return Err(TrackerError::Config("database.database must not be empty".into()));
        }
        if self.database.max_connections == 0 {
            return Err(TrackerError::Config(
                "database.max_connections must be at least 1".into(),
            ));
        }

        self.scheduler.schedule()?;
        if self.scheduler.retry_attempts == 0 {
            return Err(TrackerError::Config(
                "scheduler.retry_attempts must be at least 1".into(),
            ));
        }
        if self.scheduler.max_data_age_days == 0 {
            return Err(TrackerError::Config(
                "scheduler.max_data_age_days must be at least 1".into(),
            ));
        }

        self.report.threshold()?;

        if !LOG_LEVELS.contains(&self.logging.level.to_ascii_lowercase().as_str()) {
            return Err(TrackerError::Config(format!(
                "logging.level must be one of {:?}, got {:?}",
                LOG_LEVELS, self.logging.level
            )));
        }

        if self.storage.snapshot_cache_size == 0 {
            return Err(TrackerError::Config(
                "storage.snapshot_cache_size must be at least 1".into(),
            ));
        }

        Ok(())
    }
}
