//! In-memory snapshot store.

use super::SnapshotStore;
use crate::error::{Result, TrackerError};
use crate::types::Snapshot;
use chrono::NaiveDate;
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// Snapshot store kept entirely in memory. Contents are lost on drop.
#[derive(Default)]
pub struct MemorySnapshotStore {
    snapshots: RwLock<BTreeMap<NaiveDate, Snapshot>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.snapshots.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.read().is_empty()
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn retrieve(&self, date: NaiveDate) -> Result<Snapshot> {
        self.snapshots
            .read()
            .get(&date)
            .cloned()
            .ok_or(TrackerError::NotFound(date))
    }

    fn store(&self, snapshot: &Snapshot) -> Result<()> {
        self.snapshots.write().insert(snapshot.date(), snapshot.clone());
        Ok(())
    }

    fn purge_before(&self, cutoff: NaiveDate) -> Result<usize> {
        let mut snapshots = self.snapshots.write();
        let kept = snapshots.split_off(&cutoff);
        let purged = snapshots.len();
        *snapshots = kept;
        Ok(purged)
    }

    fn dates(&self) -> Result<Vec<NaiveDate>> {
        Ok(self.snapshots.read().keys().copied().collect())
    }

    fn exists(&self, date: NaiveDate) -> Result<bool> {
        Ok(self.snapshots.read().contains_key(&date))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_store_replaces_same_date() {
        let store = MemorySnapshotStore::new();
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

        store.store(&Snapshot::empty(date, Utc::now())).unwrap();
        store.store(&Snapshot::empty(date, Utc::now())).unwrap();

        assert_eq!(store.len(), 1);
        assert!(store.exists(date).unwrap());
    }

    #[test]
    fn test_retrieve_missing() {
        let store = MemorySnapshotStore::new();
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert!(matches!(store.retrieve(date), Err(TrackerError::NotFound(d)) if d == date));
    }
}
