//! Snapshot persistence.
//!
//! One snapshot per calendar date. Snapshots are written whole and replaced
//! atomically, so a reader never sees a partially written day. Retrieval of a
//! date that was never stored is `TrackerError::NotFound`.

mod archive;
mod file;
mod memory;

pub use archive::{ReportArchive, ReportKind};
pub use file::FileSnapshotStore;
pub use memory::MemorySnapshotStore;

use crate::error::{Result, TrackerError};
use crate::types::Snapshot;
use chrono::{Days, NaiveDate};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Storage for daily snapshots.
pub trait SnapshotStore: Send + Sync {
    /// Load the snapshot for `date`.
    fn retrieve(&self, date: NaiveDate) -> Result<Snapshot>;

    /// Store a snapshot, replacing any earlier one for the same date.
    fn store(&self, snapshot: &Snapshot) -> Result<()>;

    /// Delete every snapshot dated strictly before `cutoff`.
    fn purge_before(&self, cutoff: NaiveDate) -> Result<usize>;

    /// Dates with a stored snapshot, ascending.
    fn dates(&self) -> Result<Vec<NaiveDate>>;

    fn exists(&self, date: NaiveDate) -> Result<bool> {
        Ok(self.dates()?.contains(&date))
    }

    /// Delete snapshots more than `days` days older than `today`.
    fn purge_older_than(&self, days: u32, today: NaiveDate) -> Result<usize> {
        let cutoff = today
            .checked_sub_days(Days::new(u64::from(days)))
            .unwrap_or(NaiveDate::MIN);
        self.purge_before(cutoff)
    }

    /// Snapshots for every stored date in `start..=end`, ascending.
    ///
    /// Missing dates are skipped. Unreadable snapshots are skipped with a
    /// warning; any other failure is returned.
    fn retrieve_range(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<Snapshot>> {
        let mut snapshots = Vec::new();
        for date in start.iter_days().take_while(|d| *d <= end) {
            match self.retrieve(date) {
                Ok(snapshot) => snapshots.push(snapshot),
                Err(TrackerError::NotFound(_)) => continue,
                Err(e) if e.is_unreadable_snapshot() => {
                    tracing::warn!(%date, error = %e, "skipping unreadable snapshot");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(snapshots)
    }
}

/// Write `bytes` to a uniquely named sibling temp file, sync it, then rename
/// over `path`. Concurrent writers of one target never share a temp file.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
