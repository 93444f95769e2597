//! Error types for the inventory tracker.

use chrono::NaiveDate;
use thiserror::Error;

/// Main error type for tracker operations.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No snapshot stored for {0}")]
    NotFound(NaiveDate),

    #[error("Malformed snapshot: row {row} is missing or has an invalid `{field}`")]
    MalformedSnapshot { field: &'static str, row: usize },

    #[error("Duplicate stock line: item {item_id} in warehouse {warehouse_id:?}")]
    DuplicateStockLine {
        item_id: String,
        warehouse_id: Option<String>,
    },

    #[error("Data source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Invalid snapshot format: {0}")]
    InvalidFormat(String),

    #[error("Checksum mismatch: expected {expected}, got {got}")]
    ChecksumMismatch { expected: u32, got: u32 },

    #[error("Digest mismatch: expected {expected}, got {got}")]
    DigestMismatch { expected: String, got: String },

    #[error("Snapshot store is locked by another writer")]
    Locked,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid highlight threshold: {0} (must be a positive number)")]
    InvalidThreshold(f64),

    #[error("A tracking run is already in progress")]
    AlreadyRunning,

    #[error("Run failed after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },
}

impl TrackerError {
    /// Whether the caller can carry on with reduced output.
    ///
    /// A missing or unreadable snapshot only removes a comparison; every other
    /// error ends the current operation.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, TrackerError::NotFound(_)) || self.is_unreadable_snapshot()
    }

    /// A stored snapshot exists but its contents cannot be used: bad framing,
    /// failed checksum or digest, undecodable payload, or invalid records.
    pub fn is_unreadable_snapshot(&self) -> bool {
        match self {
            TrackerError::MalformedSnapshot { .. }
            | TrackerError::DuplicateStockLine { .. }
            | TrackerError::Deserialization(_)
            | TrackerError::InvalidFormat(_)
            | TrackerError::ChecksumMismatch { .. }
            | TrackerError::DigestMismatch { .. } => true,
            TrackerError::Io(e) => e.kind() == std::io::ErrorKind::UnexpectedEof,
            _ => false,
        }
    }
}

impl From<serde_json::Error> for TrackerError {
    fn from(e: serde_json::Error) -> Self {
        TrackerError::Serialization(e.to_string())
    }
}

impl From<rmp_serde::encode::Error> for TrackerError {
    fn from(e: rmp_serde::encode::Error) -> Self {
        TrackerError::Serialization(e.to_string())
    }
}

impl From<rmp_serde::decode::Error> for TrackerError {
    fn from(e: rmp_serde::decode::Error) -> Self {
        TrackerError::Deserialization(e.to_string())
    }
}

impl From<toml::de::Error> for TrackerError {
    fn from(e: toml::de::Error) -> Self {
        TrackerError::Config(e.to_string())
    }
}

impl From<toml::ser::Error> for TrackerError {
    fn from(e: toml::ser::Error) -> Self {
        TrackerError::Config(e.to_string())
    }
}

/// Result type for tracker operations.
pub type Result<T> = std::result::Result<T, TrackerError>;
