//! Persisted derived reports.

use super::write_atomic;
use crate::config::ReportConfig;
use crate::error::{Result, TrackerError};
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Kinds of per-date report kept on disk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReportKind {
    Daily,
    Changes,
    Deactivations,
    ZeroStock,
}

impl ReportKind {
    fn file_prefix(&self) -> &'static str {
        match self {
            ReportKind::Daily => "daily_report",
            ReportKind::Changes => "inventory_changes",
            ReportKind::Deactivations => "deactivations",
            ReportKind::ZeroStock => "zero_inventory",
        }
    }
}

/// Directory of JSON reports, one file per report kind per date.
pub struct ReportArchive {
    path: PathBuf,
}

impl ReportArchive {
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        fs::create_dir_all(&path)?;
        Ok(Self { path })
    }

    /// Archive in the configured export directory.
    pub fn from_config(config: &ReportConfig) -> Result<Self> {
        Self::new(&config.export_path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn path_for(&self, kind: ReportKind, date: NaiveDate) -> PathBuf {
        self.path
            .join(format!("{}_{}.json", kind.file_prefix(), date.format("%Y-%m-%d")))
    }

    pub fn range_path(&self, start: NaiveDate, end: NaiveDate) -> PathBuf {
        self.path.join(format!(
            "trend_report_{}_to_{}.json",
            start.format("%Y%m%d"),
            end.format("%Y%m%d")
        ))
    }

    /// Write a report, replacing an earlier one for the same kind and date.
    pub fn save<T: Serialize>(&self, kind: ReportKind, date: NaiveDate, report: &T) -> Result<PathBuf> {
        let path = self.path_for(kind, date);
        write_atomic(&path, &serde_json::to_vec_pretty(report)?)?;
        tracing::debug!(?kind, %date, path = %path.display(), "archived report");
        Ok(path)
    }

    /// Write a report covering a date range.
    pub fn save_range<T: Serialize>(&self, start: NaiveDate, end: NaiveDate, report: &T) -> Result<PathBuf> {
        let path = self.range_path(start, end);
        write_atomic(&path, &serde_json::to_vec_pretty(report)?)?;
        tracing::debug!(%start, %end, path = %path.display(), "archived range report");
        Ok(path)
    }

    /// Read a report back, or `None` if it was never written.
    pub fn load<T: DeserializeOwned>(&self, kind: ReportKind, date: NaiveDate) -> Result<Option<T>> {
        let path = self.path_for(kind, date);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let report = serde_json::from_slice(&bytes)
            .map_err(|e| TrackerError::Deserialization(e.to_string()))?;
        Ok(Some(report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use tempfile::TempDir;

    #[test]
    fn test_file_naming() {
        let dir = TempDir::new().unwrap();
        let archive = ReportArchive::new(dir.path()).unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 4, 6).unwrap();

        assert!(archive
            .path_for(ReportKind::ZeroStock, date)
            .ends_with("zero_inventory_2024-03-07.json"));
        assert!(archive
            .path_for(ReportKind::Daily, date)
            .ends_with("daily_report_2024-03-07.json"));
        assert!(archive
            .range_path(date, end)
            .ends_with("trend_report_20240307_to_20240406.json"));
    }

    #[test]
    fn test_from_config() {
        let dir = TempDir::new().unwrap();
        let config = ReportConfig {
            export_path: dir.path().join("exports"),
            ..Default::default()
        };
        let archive = ReportArchive::from_config(&config).unwrap();
        assert!(archive.path().is_dir());
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let archive = ReportArchive::new(dir.path().join("reports")).unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();

        let report = json!({"deactivated_count": 2});
        archive.save(ReportKind::Deactivations, date, &report).unwrap();

        let loaded: Option<Value> = archive.load(ReportKind::Deactivations, date).unwrap();
        assert_eq!(loaded, Some(report));

        let missing: Option<Value> = archive.load(ReportKind::Changes, date).unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn test_concurrent_saves_of_one_report() {
        let dir = TempDir::new().unwrap();
        let archive = ReportArchive::new(dir.path()).unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 3, 8).unwrap();
        let reports: Vec<Value> = (0..2)
            .map(|n| json!({"writer": n, "items": vec![n; 20_000]}))
            .collect();

        std::thread::scope(|scope| {
            for report in &reports {
                let archive = &archive;
                scope.spawn(move || {
                    for _ in 0..20 {
                        archive.save(ReportKind::Daily, date, report).unwrap();
                    }
                });
            }
        });

        let loaded: Value = archive.load(ReportKind::Daily, date).unwrap().unwrap();
        assert!(reports.contains(&loaded));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
