//! # Inventory Tracker
//!
//! Daily inventory snapshots and the reports derived from them.
//!
//! ## Core Concepts
//!
//! - **Snapshots**: The full set of stock lines for one calendar date
//! - **Analysis**: Pure comparisons of snapshots (changes, deactivations,
//!   zero stock, multi-day trend)
//! - **Store**: One atomically replaced snapshot per date
//! - **Tracker**: The daily run that captures, compares, stores and purges
//! - **Scheduler**: Retry policy and single-flight execution of that run
//!
//! ## Example
//!
//! ```ignore
//! use inventory_tracker::{FileSnapshotStore, InventoryTracker, TaskRunner, TrackerConfig};
//!
//! let config = TrackerConfig::load_or_default("config/tracker.toml")?;
//! inventory_tracker::logging::init(&config.logging)?;
//!
//! let store = Arc::new(FileSnapshotStore::from_config(&config.storage)?);
//! let tracker = InventoryTracker::from_config(source, store, &config)?;
//! let runner = TaskRunner::from_config(tracker, &config.scheduler);
//!
//! let report = runner.run_now()?;
//! println!("{} items without stock", report.zero_stock.count());
//! ```

pub mod analysis;
pub mod config;
pub mod error;
pub mod logging;
pub mod report;
pub mod scheduler;
pub mod source;
pub mod store;
pub mod tracker;
pub mod types;

// Re-exports
pub use analysis::{
    classify_trend, compute_changes, compute_trend, detect_deactivations, detect_zero_stock,
    ChangeReport, ChangeWarning, DailyCounts, Deactivation, DeactivationReport,
    HighlightThreshold, SignificantChange, TrendLabel, TrendSummary, ZeroStockItem,
    ZeroStockReport, DEFAULT_HIGHLIGHT_THRESHOLD,
};
pub use config::{
    DatabaseConfig, DatabaseKind, ExportFormat, LoggingConfig, ReportConfig, SchedulerConfig,
    SnapshotEncoding, StorageConfig, TrackerConfig, UiConfig,
};
pub use error::{Result, TrackerError};
pub use report::{
    build_daily_report, format, DailyReport, FormatMode, FormattedView, ReportGenerator,
    ReportSummary, SummaryView, Table, TableView, TrendReport,
};
pub use scheduler::{
    Backoff, DailySchedule, NotificationHub, RetryPolicy, RunEvent, RunSubscription, TaskRunner,
};
pub use source::{DataSource, SqlDialect, StaticSource};
pub use store::{FileSnapshotStore, MemorySnapshotStore, ReportArchive, ReportKind, SnapshotStore};
pub use tracker::InventoryTracker;
pub use types::{InventoryRecord, ItemStatus, Snapshot, SnapshotDigest, SourceRow, StockKey};
