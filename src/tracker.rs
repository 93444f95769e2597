//! The daily tracking run.

use crate::analysis::HighlightThreshold;
use crate::config::TrackerConfig;
use crate::error::{Result, TrackerError};
use crate::report::{build_daily_report, previous_snapshot, DailyReport};
use crate::source::DataSource;
use crate::store::{ReportArchive, ReportKind, SnapshotStore};
use crate::types::Snapshot;
use chrono::{NaiveDate, Utc};
use std::sync::Arc;

/// Captures one snapshot per day and derives that day's report from it.
pub struct InventoryTracker {
    source: Arc<dyn DataSource>,
    store: Arc<dyn SnapshotStore>,
    archive: Option<ReportArchive>,
    threshold: HighlightThreshold,
    max_data_age_days: u32,
}

impl InventoryTracker {
    pub fn new(
        source: Arc<dyn DataSource>,
        store: Arc<dyn SnapshotStore>,
        threshold: HighlightThreshold,
        max_data_age_days: u32,
    ) -> Self {
        Self {
            source,
            store,
            archive: None,
            threshold,
            max_data_age_days,
        }
    }

    /// Build a tracker from the Report and Scheduler sections of `config`.
    pub fn from_config(
        source: Arc<dyn DataSource>,
        store: Arc<dyn SnapshotStore>,
        config: &TrackerConfig,
    ) -> Result<Self> {
        Ok(Self::new(
            source,
            store,
            config.report.threshold()?,
            config.scheduler.max_data_age_days,
        ))
    }

    pub fn with_archive(mut self, archive: ReportArchive) -> Self {
        self.archive = Some(archive);
        self
    }

    pub fn store(&self) -> &Arc<dyn SnapshotStore> {
        &self.store
    }

    /// Capture the inventory as of `date` and report on it.
    ///
    /// A missing or unusable previous snapshot drops the comparison sections
    /// but does not fail the run. Running twice for the same date replaces
    /// the stored snapshot.
    pub fn track(&self, date: NaiveDate) -> Result<DailyReport> {
        tracing::info!(%date, "starting inventory run");

        let rows = self.source.fetch_inventory()?;
        if rows.is_empty() {
            return Err(TrackerError::SourceUnavailable("no inventory rows".to_string()));
        }
        let current = Snapshot::from_rows(date, Utc::now(), &rows)?;
        tracing::info!(%date, rows = current.len(), active = current.active_count(), "fetched inventory");

        let previous = previous_snapshot(self.store.as_ref(), date)?;
        let report = build_daily_report(&current, previous.as_ref(), self.threshold, Utc::now());

        self.store.store(&current)?;
        if let Some(archive) = &self.archive {
            self.archive_report(archive, &report)?;
        }

        let purged = self.store.purge_older_than(self.max_data_age_days, date)?;
        if purged > 0 {
            tracing::info!(purged, max_age_days = self.max_data_age_days, "purged old snapshots");
        }

        tracing::info!(
            %date,
            zero_stock = report.zero_stock.count(),
            significant_changes = report.changes.as_ref().map_or(0, |c| c.significant_count()),
            deactivations = report.deactivations.as_ref().map_or(0, |d| d.count()),
            "inventory run complete"
        );
        Ok(report)
    }

    fn archive_report(&self, archive: &ReportArchive, report: &DailyReport) -> Result<()> {
        archive.save(ReportKind::Daily, report.date, report)?;
        archive.save(ReportKind::ZeroStock, report.date, &report.zero_stock)?;
        if let Some(changes) = &report.changes {
            archive.save(ReportKind::Changes, report.date, changes)?;
        }
        if let Some(deactivations) = &report.deactivations {
            archive.save(ReportKind::Deactivations, report.date, deactivations)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{ChangeReport, ZeroStockReport};
    use crate::source::StaticSource;
    use crate::store::MemorySnapshotStore;
    use crate::types::SourceRow;
    use serde_json::json;
    use tempfile::TempDir;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
    }

    fn rows(quantity: u64, status: &str) -> Vec<SourceRow> {
        vec![
            json!({"item_id": "1", "item_number": "A-1", "status": status, "quantity": quantity, "warehouse_id": "W"}),
            json!({"item_id": "2", "item_number": "A-2", "status": "active", "quantity": 0, "warehouse_id": null}),
        ]
        .into_iter()
        .map(|v| v.as_object().unwrap().clone())
        .collect()
    }

    fn tracker(source: StaticSource, store: Arc<MemorySnapshotStore>, max_age: u32) -> InventoryTracker {
        InventoryTracker::new(Arc::new(source), store, HighlightThreshold::default(), max_age)
    }

    #[test]
    fn test_first_run_has_no_comparison() {
        let store = Arc::new(MemorySnapshotStore::new());
        let report = tracker(StaticSource::new(rows(10, "active")), store.clone(), 90)
            .track(day(1))
            .unwrap();

        assert!(!report.has_comparison());
        assert_eq!(report.zero_stock.count(), 1);
        assert!(store.exists(day(1)).unwrap());
    }

    #[test]
    fn test_second_run_compares() {
        let store = Arc::new(MemorySnapshotStore::new());
        tracker(StaticSource::new(rows(10, "aktiv")), store.clone(), 90)
            .track(day(1))
            .unwrap();
        let report = tracker(StaticSource::new(rows(2, "inaktiv")), store.clone(), 90)
            .track(day(2))
            .unwrap();

        let changes = report.changes.unwrap();
        assert_eq!(changes.decreased, 1);
        assert_eq!(changes.significant_changes[0].delta, -8);
        assert_eq!(report.deactivations.unwrap().count(), 1);
    }

    #[test]
    fn test_empty_fetch_fails_without_storing() {
        let store = Arc::new(MemorySnapshotStore::new());
        let result = tracker(StaticSource::new(Vec::new()), store.clone(), 90).track(day(1));
        assert!(matches!(result, Err(TrackerError::SourceUnavailable(_))));
        assert!(store.is_empty());
    }

    #[test]
    fn test_malformed_fetch_fails() {
        let store = Arc::new(MemorySnapshotStore::new());
        let mut bad = rows(1, "active");
        bad[1].remove("item_number");
        let result = tracker(StaticSource::new(bad), store.clone(), 90).track(day(1));
        assert!(matches!(
            result,
            Err(TrackerError::MalformedSnapshot { field: "item_number", row: 1 })
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn test_purges_old_snapshots() {
        let store = Arc::new(MemorySnapshotStore::new());
        let tracker = tracker(StaticSource::new(rows(1, "active")), store.clone(), 2);
        for d in 1..=5 {
            tracker.track(day(d)).unwrap();
        }
        assert_eq!(store.dates().unwrap(), vec![day(3), day(4), day(5)]);
    }

    #[test]
    fn test_archives_sections() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(MemorySnapshotStore::new());
        let archive = ReportArchive::new(dir.path()).unwrap();
        let tracker = tracker(StaticSource::new(rows(10, "active")), store, 90).with_archive(archive);

        tracker.track(day(1)).unwrap();
        tracker.track(day(2)).unwrap();

        let reread = ReportArchive::new(dir.path()).unwrap();
        let zero: Option<ZeroStockReport> = reread.load(ReportKind::ZeroStock, day(1)).unwrap();
        assert_eq!(zero.unwrap().count(), 1);
        let changes: Option<ChangeReport> = reread.load(ReportKind::Changes, day(1)).unwrap();
        assert!(changes.is_none());
        let changes: Option<ChangeReport> = reread.load(ReportKind::Changes, day(2)).unwrap();
        assert_eq!(changes.unwrap().unchanged, 2);
    }
}
