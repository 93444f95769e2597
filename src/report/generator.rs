//! Reports read back from the snapshot store.

use super::daily::{build_daily_report, previous_snapshot, DailyReport};
use crate::analysis::{compute_trend, HighlightThreshold, TrendSummary};
use crate::config::ReportConfig;
use crate::error::{Result, TrackerError};
use crate::store::{ReportArchive, ReportKind, SnapshotStore};
use chrono::{DateTime, Days, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Trend over a date range, optionally for one category.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrendReport {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub generated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub summary: TrendSummary,
}

/// Builds reports for dates that already have a stored snapshot.
///
/// Only reads from the store, so it can serve a dashboard while a tracking
/// run is writing.
pub struct ReportGenerator {
    store: Arc<dyn SnapshotStore>,
    threshold: HighlightThreshold,
    history_days: u32,
    archive: Option<ReportArchive>,
}

impl ReportGenerator {
    pub fn new(store: Arc<dyn SnapshotStore>, threshold: HighlightThreshold, history_days: u32) -> Self {
        Self {
            store,
            threshold,
            history_days,
            archive: None,
        }
    }

    pub fn from_config(store: Arc<dyn SnapshotStore>, config: &ReportConfig) -> Result<Self> {
        Ok(Self::new(store, config.threshold()?, config.history_days))
    }

    /// Also write every generated report to `archive`.
    pub fn with_archive(mut self, archive: ReportArchive) -> Self {
        self.archive = Some(archive);
        self
    }

    /// Report for `date`, compared against the day before when available.
    pub fn daily_report(&self, date: NaiveDate) -> Result<DailyReport> {
        let current = self.store.retrieve(date)?;
        let previous = previous_snapshot(self.store.as_ref(), date)?;

        let report = build_daily_report(&current, previous.as_ref(), self.threshold, Utc::now());
        tracing::info!(
            %date,
            total = report.total_items,
            zero_stock = report.zero_stock.count(),
            compared = report.has_comparison(),
            "generated daily report"
        );

        if let Some(archive) = &self.archive {
            archive.save(ReportKind::Daily, date, &report)?;
        }
        Ok(report)
    }

    /// Trend over `start..=end`.
    ///
    /// `end` defaults to today and `start` to `history_days` before `end`.
    /// Dates without a snapshot are skipped; a range with no snapshots at
    /// all is `NotFound` for its start date.
    pub fn trend_report(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        category: Option<&str>,
    ) -> Result<TrendReport> {
        let end = end.unwrap_or_else(|| Local::now().date_naive());
        let start = start.unwrap_or_else(|| {
            end.checked_sub_days(Days::new(u64::from(self.history_days)))
                .unwrap_or(NaiveDate::MIN)
        });

        let snapshots = self.store.retrieve_range(start, end)?;
        if snapshots.is_empty() {
            tracing::warn!(%start, %end, "no snapshots in range");
            return Err(TrackerError::NotFound(start));
        }

        let report = TrendReport {
            start_date: start,
            end_date: end,
            generated_at: Utc::now(),
            category: category.map(str::to_string),
            summary: compute_trend(&snapshots, category),
        };
        tracing::info!(%start, %end, days = report.summary.days.len(), trend = %report.summary.trend, "generated trend report");

        if let Some(archive) = &self.archive {
            archive.save_range(start, end, &report)?;
        }
        Ok(report)
    }
}
