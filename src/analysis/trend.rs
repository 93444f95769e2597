//! Multi-day summaries.

use crate::types::Snapshot;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Relative change in active items, first vs. last day, needed to leave `Stable`.
const TREND_BAND: f64 = 0.05;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendLabel {
    Increasing,
    Decreasing,
    Stable,
}

impl fmt::Display for TrendLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TrendLabel::Increasing => "increasing",
            TrendLabel::Decreasing => "decreasing",
            TrendLabel::Stable => "stable",
        };
        f.write_str(s)
    }
}

/// Counts for one included date.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyCounts {
    pub date: NaiveDate,
    pub total: usize,
    pub active: usize,
    pub zero_stock: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrendSummary {
    /// Included dates, in input order.
    pub dates: Vec<NaiveDate>,
    pub days: Vec<DailyCounts>,
    pub avg_total_per_day: f64,
    pub trend: TrendLabel,
}

impl TrendSummary {
    pub fn active_counts(&self) -> Vec<usize> {
        self.days.iter().map(|d| d.active).collect()
    }

    pub fn zero_stock_counts(&self) -> Vec<usize> {
        self.days.iter().map(|d| d.zero_stock).collect()
    }

    pub fn counts_for(&self, date: NaiveDate) -> Option<&DailyCounts> {
        self.days.iter().find(|d| d.date == date)
    }
}

/// Classify the change from `first` to `last` active items.
///
/// Strictly more than 5% up is increasing, strictly more than 5% down is
/// decreasing.
pub fn classify_trend(first: usize, last: usize) -> TrendLabel {
    let first = first as f64;
    let last = last as f64;
    if last > first * (1.0 + TREND_BAND) {
        TrendLabel::Increasing
    } else if last < first * (1.0 - TREND_BAND) {
        TrendLabel::Decreasing
    } else {
        TrendLabel::Stable
    }
}

/// Summarize a run of daily snapshots.
///
/// Snapshots are expected in ascending date order; missing dates are simply
/// absent from the input. With `category`, each snapshot is first restricted
/// to that category.
pub fn compute_trend<'a, I>(snapshots: I, category: Option<&str>) -> TrendSummary
where
    I: IntoIterator<Item = &'a Snapshot>,
{
    let days: Vec<DailyCounts> = snapshots
        .into_iter()
        .map(|snapshot| {
            let counts = |s: &Snapshot| DailyCounts {
                date: s.date(),
                total: s.len(),
                active: s.active_count(),
                zero_stock: s.zero_stock_count(),
            };
            match category {
                Some(category) => counts(&snapshot.restricted_to_category(category)),
                None => counts(snapshot),
            }
        })
        .collect();

    let avg_total_per_day = if days.is_empty() {
        0.0
    } else {
        days.iter().map(|d| d.total as f64).sum::<f64>() / days.len() as f64
    };

    let trend = match (days.first(), days.last()) {
        (Some(first), Some(last)) if days.len() >= 2 => classify_trend(first.active, last.active),
        _ => TrendLabel::Stable,
    };

    TrendSummary {
        dates: days.iter().map(|d| d.date).collect(),
        days,
        avg_total_per_day,
        trend,
    }
}
