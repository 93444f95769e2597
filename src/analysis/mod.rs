//! Snapshot analysis.
//!
//! Every function here is a pure function of already-materialized snapshots:
//! nothing is read from or written to a store, so the detectors can run while
//! other readers access the same snapshots.
//!
//! - [`compute_changes`]: quantity deltas per stock line between two days
//! - [`detect_deactivations`]: items that went from active to inactive
//! - [`detect_zero_stock`]: active stock lines with nothing on hand
//! - [`compute_trend`]: per-day counts and a coarse trend over a date range

mod changes;
mod deactivations;
mod trend;
mod zero_stock;

pub use changes::{
    compute_changes, ChangeReport, ChangeWarning, HighlightThreshold, SignificantChange,
    DEFAULT_HIGHLIGHT_THRESHOLD,
};
pub use deactivations::{detect_deactivations, Deactivation, DeactivationReport};
pub use trend::{classify_trend, compute_trend, DailyCounts, TrendLabel, TrendSummary};
pub use zero_stock::{detect_zero_stock, ZeroStockItem, ZeroStockReport};
