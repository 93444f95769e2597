//! The per-day report.

use crate::analysis::{
    compute_changes, detect_deactivations, detect_zero_stock, ChangeReport, DeactivationReport,
    HighlightThreshold, ZeroStockReport,
};
use crate::error::{Result, TrackerError};
use crate::store::SnapshotStore;
use crate::types::{Snapshot, SnapshotDigest};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Everything derived for one day.
///
/// `changes` and `deactivations` need the previous day's snapshot and are
/// absent (not empty) when there was none.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DailyReport {
    pub date: NaiveDate,
    pub generated_at: DateTime<Utc>,
    /// Digest of the snapshot the report was computed from.
    pub snapshot_digest: SnapshotDigest,
    pub total_items: usize,
    pub active_items: usize,
    pub zero_stock: ZeroStockReport,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changes: Option<ChangeReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deactivations: Option<DeactivationReport>,
}

impl DailyReport {
    pub fn has_comparison(&self) -> bool {
        self.changes.is_some()
    }
}

/// Run every detector over `current`, and the two-snapshot ones when
/// `previous` is given.
pub fn build_daily_report(
    current: &Snapshot,
    previous: Option<&Snapshot>,
    threshold: HighlightThreshold,
    generated_at: DateTime<Utc>,
) -> DailyReport {
    DailyReport {
        date: current.date(),
        generated_at,
        snapshot_digest: current.digest(),
        total_items: current.len(),
        active_items: current.active_count(),
        zero_stock: detect_zero_stock(current),
        changes: previous.map(|previous| compute_changes(current, previous, threshold)),
        deactivations: previous.map(|previous| detect_deactivations(current, previous)),
    }
}

/// The snapshot of the day before `date`, if one can be used.
///
/// A missing, corrupted or malformed previous snapshot only means no
/// comparison is possible; it is logged and reported as `None`.
pub fn previous_snapshot(store: &dyn SnapshotStore, date: NaiveDate) -> Result<Option<Snapshot>> {
    let Some(previous_date) = date.pred_opt() else {
        return Ok(None);
    };
    match store.retrieve(previous_date) {
        Ok(snapshot) => Ok(Some(snapshot)),
        Err(TrackerError::NotFound(_)) => {
            tracing::warn!(date = %previous_date, "no previous snapshot, skipping comparison");
            Ok(None)
        }
        Err(e) if e.is_unreadable_snapshot() => {
            tracing::warn!(date = %previous_date, error = %e, "previous snapshot unusable, skipping comparison");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}
