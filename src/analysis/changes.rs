//! Quantity comparison between two snapshots.

use crate::error::{Result, TrackerError};
use crate::types::{InventoryRecord, Snapshot, StockKey};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default significance threshold, in percent.
pub const DEFAULT_HIGHLIGHT_THRESHOLD: f64 = 10.0;

/// Minimum absolute percentage change for a row to count as significant.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct HighlightThreshold(f64);

impl HighlightThreshold {
    /// Validate a threshold. It must be a finite, positive percentage.
    pub fn new(percent: f64) -> Result<Self> {
        if percent.is_finite() && percent > 0.0 {
            Ok(HighlightThreshold(percent))
        } else {
            Err(TrackerError::InvalidThreshold(percent))
        }
    }

    pub fn percent(&self) -> f64 {
        self.0
    }

    fn admits(&self, delta_percent: f64) -> bool {
        delta_percent.abs() >= self.0
    }
}

impl Default for HighlightThreshold {
    fn default() -> Self {
        HighlightThreshold(DEFAULT_HIGHLIGHT_THRESHOLD)
    }
}

impl TryFrom<f64> for HighlightThreshold {
    type Error = TrackerError;

    fn try_from(value: f64) -> Result<Self> {
        HighlightThreshold::new(value)
    }
}

impl From<HighlightThreshold> for f64 {
    fn from(threshold: HighlightThreshold) -> f64 {
        threshold.0
    }
}

/// A stock line whose quantity moved by at least the threshold.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SignificantChange {
    pub item_id: String,
    pub warehouse_id: Option<String>,
    pub item_number: String,
    pub name: Option<String>,
    pub quantity_previous: u64,
    pub quantity_current: u64,
    pub delta: i64,
    pub delta_percent: f64,
}

/// Conditions worth surfacing alongside an otherwise valid report.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeWarning {
    /// The current snapshot held no records, so nothing was compared.
    EmptyCurrent,
}

/// Result of comparing two snapshots.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChangeReport {
    /// Capture time of the current snapshot.
    pub timestamp: DateTime<Utc>,
    pub threshold: HighlightThreshold,
    /// Rows in the outer join of both snapshots.
    pub total_items: usize,
    pub increased: usize,
    pub decreased: usize,
    pub unchanged: usize,
    pub significant_changes: Vec<SignificantChange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<ChangeWarning>,
}

impl ChangeReport {
    pub fn significant_count(&self) -> usize {
        self.significant_changes.len()
    }
}

/// `current - previous`, saturating at the `i64` range.
fn quantity_delta(current: u64, previous: u64) -> i64 {
    let delta = i128::from(current) - i128::from(previous);
    delta.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64
}

/// Percentage change relative to the previous quantity.
///
/// A previous quantity of zero is divided as one, so stock appearing from
/// nothing reports `current * 100` percent.
pub fn delta_percent(quantity_previous: u64, delta: i64) -> f64 {
    let denominator = if quantity_previous == 0 { 1 } else { quantity_previous };
    delta as f64 / denominator as f64 * 100.0
}

/// Compare `current` against `previous` on `(item_id, warehouse_id)`.
///
/// Lines present on one side only are compared against a quantity of zero,
/// so new and removed lines show up as maximal deltas. Significant changes
/// are returned in key order.
pub fn compute_changes(
    current: &Snapshot,
    previous: &Snapshot,
    threshold: HighlightThreshold,
) -> ChangeReport {
    let mut report = ChangeReport {
        timestamp: current.captured_at(),
        threshold,
        total_items: 0,
        increased: 0,
        decreased: 0,
        unchanged: 0,
        significant_changes: Vec::new(),
        warning: None,
    };

    if current.is_empty() {
        tracing::warn!(date = %current.date(), "current snapshot is empty, skipping comparison");
        report.warning = Some(ChangeWarning::EmptyCurrent);
        return report;
    }

    let mut joined: BTreeMap<StockKey, (Option<&InventoryRecord>, Option<&InventoryRecord>)> =
        BTreeMap::new();
    for record in current {
        joined.entry(record.key()).or_default().0 = Some(record);
    }
    for record in previous {
        joined.entry(record.key()).or_default().1 = Some(record);
    }

    report.total_items = joined.len();

    for (key, (now, before)) in joined {
        let quantity_current = now.map_or(0, |r| r.quantity);
        let quantity_previous = before.map_or(0, |r| r.quantity);
        let delta = quantity_delta(quantity_current, quantity_previous);

        match delta {
            d if d > 0 => report.increased += 1,
            d if d < 0 => report.decreased += 1,
            _ => report.unchanged += 1,
        }

        let percent = delta_percent(quantity_previous, delta);
        if !threshold.admits(percent) {
            continue;
        }

        // Removed lines only exist on the previous side.
        let Some(describing) = now.or(before) else {
            continue;
        };
        report.significant_changes.push(SignificantChange {
            item_id: key.item_id,
            warehouse_id: key.warehouse_id,
            item_number: describing.item_number.clone(),
            name: describing.name.clone(),
            quantity_previous,
            quantity_current,
            delta,
            delta_percent: percent,
        });
    }

    tracing::debug!(
        date = %current.date(),
        total = report.total_items,
        significant = report.significant_count(),
        "compared inventory levels"
    );

    report
}
