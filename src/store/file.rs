//! File-backed snapshot store.

use super::{write_atomic, SnapshotStore};
use crate::config::{SnapshotEncoding, StorageConfig};
use crate::error::{Result, TrackerError};
use crate::types::{InventoryRecord, Snapshot, SnapshotDigest, SourceRow};
use chrono::{DateTime, NaiveDate, Utc};
use fs2::FileExt;
use lru::LruCache;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Read;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Magic bytes for snapshot files.
const SNAPSHOT_MAGIC: &[u8; 4] = b"SNP\0";

/// Current snapshot format version.
const SNAPSHOT_VERSION: u8 = 1;

const FILE_PREFIX: &str = "inventory_";
const FILE_SUFFIX: &str = ".snap";
const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Serialize)]
struct EnvelopeOut<'a> {
    captured_at: DateTime<Utc>,
    records: &'a [InventoryRecord],
}

/// Records are read back as flat rows so they pass the same checks as
/// freshly fetched source data.
#[derive(Deserialize)]
struct EnvelopeIn {
    captured_at: DateTime<Utc>,
    records: Vec<SourceRow>,
}

fn encoding_tag(encoding: SnapshotEncoding) -> u8 {
    match encoding {
        SnapshotEncoding::Json => 0,
        SnapshotEncoding::Msgpack => 1,
    }
}

fn encoding_from_tag(tag: u8) -> Result<SnapshotEncoding> {
    match tag {
        0 => Ok(SnapshotEncoding::Json),
        1 => Ok(SnapshotEncoding::Msgpack),
        other => Err(TrackerError::InvalidFormat(format!(
            "Unknown snapshot encoding: {}",
            other
        ))),
    }
}

/// Size and modification time of a snapshot file when it was last read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct FileStamp {
    len: u64,
    modified: Option<SystemTime>,
}

impl FileStamp {
    fn of(path: &Path) -> std::io::Result<Self> {
        let metadata = fs::metadata(path)?;
        Ok(Self {
            len: metadata.len(),
            modified: metadata.modified().ok(),
        })
    }
}

/// Snapshot store with one file per date.
///
/// File layout: magic, version, encoding tag, SHA-256 digest of the records,
/// payload length (u64 LE), payload, CRC32 of the payload (u32 LE).
pub struct FileSnapshotStore {
    /// Directory holding the snapshot files.
    path: PathBuf,

    /// Payload encoding for new snapshots. Reads accept either.
    encoding: SnapshotEncoding,

    /// Recently read or written snapshots, keyed by date and checked against
    /// the file's stamp on every hit so other processes' writes are seen.
    cache: Mutex<LruCache<NaiveDate, (FileStamp, Snapshot)>>,

    /// Serializes writers within this process.
    write_lock: Mutex<()>,
}

impl FileSnapshotStore {
    /// Open (or create) a store in `path`.
    pub fn new(path: impl AsRef<Path>, cache_size: usize, encoding: SnapshotEncoding) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        fs::create_dir_all(&path)?;

        let cache_size = NonZeroUsize::new(cache_size).unwrap_or(NonZeroUsize::MIN);

        Ok(Self {
            path,
            encoding,
            cache: Mutex::new(LruCache::new(cache_size)),
            write_lock: Mutex::new(()),
        })
    }

    pub fn from_config(config: &StorageConfig) -> Result<Self> {
        Self::new(&config.data_path, config.snapshot_cache_size, config.encoding)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Full path of the file for a date.
    pub fn snapshot_path(&self, date: NaiveDate) -> PathBuf {
        self.path
            .join(format!("{}{}{}", FILE_PREFIX, date.format(DATE_FORMAT), FILE_SUFFIX))
    }

    fn parse_file_name(name: &str) -> Option<NaiveDate> {
        let date = name.strip_prefix(FILE_PREFIX)?.strip_suffix(FILE_SUFFIX)?;
        NaiveDate::parse_from_str(date, DATE_FORMAT).ok()
    }

    /// Take the cross-process writer lock. Released when the file is dropped.
    fn acquire_lock(&self) -> Result<File> {
        let lock_file = File::create(self.path.join("LOCK"))?;
        lock_file
            .try_lock_exclusive()
            .map_err(|_| TrackerError::Locked)?;
        Ok(lock_file)
    }

    fn encode(&self, snapshot: &Snapshot) -> Result<Vec<u8>> {
        let envelope = EnvelopeOut {
            captured_at: snapshot.captured_at(),
            records: snapshot.records(),
        };
        let payload = match self.encoding {
            SnapshotEncoding::Json => serde_json::to_vec(&envelope)?,
            SnapshotEncoding::Msgpack => rmp_serde::to_vec_named(&envelope)?,
        };

        let digest = snapshot.digest();
        let mut frame = Vec::with_capacity(payload.len() + 50);
        frame.extend_from_slice(SNAPSHOT_MAGIC);
        frame.push(SNAPSHOT_VERSION);
        frame.push(encoding_tag(self.encoding));
        frame.extend_from_slice(&digest.0);
        frame.extend_from_slice(&(payload.len() as u64).to_le_bytes());
        frame.extend_from_slice(&payload);
        frame.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
        Ok(frame)
    }

    fn decode(date: NaiveDate, bytes: &[u8]) -> Result<Snapshot> {
        let mut reader = bytes;

        // Read and verify magic
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if &magic != SNAPSHOT_MAGIC {
            return Err(TrackerError::InvalidFormat("Invalid snapshot magic".into()));
        }

        let mut header = [0u8; 2];
        reader.read_exact(&mut header)?;
        if header[0] != SNAPSHOT_VERSION {
            return Err(TrackerError::InvalidFormat(format!(
                "Unsupported snapshot version: {}",
                header[0]
            )));
        }
        let encoding = encoding_from_tag(header[1])?;

        let mut stored_digest = [0u8; 32];
        reader.read_exact(&mut stored_digest)?;
        let stored_digest = SnapshotDigest(stored_digest);

        let mut len_bytes = [0u8; 8];
        reader.read_exact(&mut len_bytes)?;
        let payload_len = u64::from_le_bytes(len_bytes) as usize;
        if payload_len > reader.len() {
            return Err(TrackerError::InvalidFormat("Truncated snapshot payload".into()));
        }

        let mut payload = vec![0u8; payload_len];
        reader.read_exact(&mut payload)?;

        // Read and verify checksum
        let mut checksum_bytes = [0u8; 4];
        reader.read_exact(&mut checksum_bytes)?;
        let stored_checksum = u32::from_le_bytes(checksum_bytes);
        let computed_checksum = crc32fast::hash(&payload);
        if stored_checksum != computed_checksum {
            return Err(TrackerError::ChecksumMismatch {
                expected: stored_checksum,
                got: computed_checksum,
            });
        }

        let envelope: EnvelopeIn = match encoding {
            SnapshotEncoding::Json => serde_json::from_slice(&payload)
                .map_err(|e| TrackerError::Deserialization(e.to_string()))?,
            SnapshotEncoding::Msgpack => rmp_serde::from_slice(&payload)?,
        };

        let snapshot = Snapshot::from_rows(date, envelope.captured_at, &envelope.records)?;

        let computed_digest = snapshot.digest();
        if computed_digest != stored_digest {
            return Err(TrackerError::DigestMismatch {
                expected: stored_digest.to_hex(),
                got: computed_digest.to_hex(),
            });
        }

        Ok(snapshot)
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn retrieve(&self, date: NaiveDate) -> Result<Snapshot> {
        let path = self.snapshot_path(date);
        let not_found = || {
            self.cache.lock().pop(&date);
            tracing::debug!(%date, "no snapshot on disk");
            TrackerError::NotFound(date)
        };

        let stamp = match FileStamp::of(&path) {
            Ok(stamp) => stamp,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(not_found()),
            Err(e) => return Err(e.into()),
        };

        // Check cache first
        if let Some((cached_stamp, cached)) = self.cache.lock().get(&date) {
            if *cached_stamp == stamp {
                return Ok(cached.clone());
            }
        }

        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(not_found()),
            Err(e) => return Err(e.into()),
        };

        let snapshot = Self::decode(date, &bytes)?;
        tracing::debug!(%date, records = snapshot.len(), "loaded snapshot");

        self.cache.lock().put(date, (stamp, snapshot.clone()));
        Ok(snapshot)
    }

    fn store(&self, snapshot: &Snapshot) -> Result<()> {
        let _guard = self.write_lock.lock();
        let _lock = self.acquire_lock()?;

        let frame = self.encode(snapshot)?;
        let path = self.snapshot_path(snapshot.date());
        write_atomic(&path, &frame)?;

        tracing::info!(
            date = %snapshot.date(),
            records = snapshot.len(),
            path = %path.display(),
            "stored snapshot"
        );

        let stamp = FileStamp::of(&path)?;
        self.cache.lock().put(snapshot.date(), (stamp, snapshot.clone()));
        Ok(())
    }

    fn purge_before(&self, cutoff: NaiveDate) -> Result<usize> {
        let _guard = self.write_lock.lock();
        let _lock = self.acquire_lock()?;

        let mut purged = 0;
        for date in self.dates()?.into_iter().filter(|d| *d < cutoff) {
            self.cache.lock().pop(&date);
            fs::remove_file(self.snapshot_path(date))?;
            purged += 1;
        }

        if purged > 0 {
            tracing::info!(%cutoff, purged, "purged old snapshots");
        }
        Ok(purged)
    }

    fn dates(&self) -> Result<Vec<NaiveDate>> {
        let mut dates = Vec::new();
        for entry in fs::read_dir(&self.path)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(date) = Self::parse_file_name(&entry.file_name().to_string_lossy()) {
                dates.push(date);
            }
        }
        dates.sort();
        Ok(dates)
    }

    fn exists(&self, date: NaiveDate) -> Result<bool> {
        Ok(self.snapshot_path(date).is_file())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ItemStatus;
    use tempfile::TempDir;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, d).unwrap()
    }

    fn sample(d: u32) -> Snapshot {
        Snapshot::new(
            day(d),
            Utc::now(),
            vec![
                InventoryRecord::new("1", "A-1", Some("W1"), 10, ItemStatus::Active)
                    .with_name("Bolt")
                    .with_category("hardware"),
                InventoryRecord::new("2", "A-2", None, 0, ItemStatus::Inactive),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_store_and_retrieve() {
        let dir = TempDir::new().unwrap();
        let store = FileSnapshotStore::new(dir.path().join("inventory"), 4, SnapshotEncoding::Json).unwrap();

        let snapshot = sample(1);
        store.store(&snapshot).unwrap();

        // Bypass the cache with a second handle on the same directory.
        let reader = FileSnapshotStore::new(dir.path().join("inventory"), 4, SnapshotEncoding::Json).unwrap();
        let loaded = reader.retrieve(day(1)).unwrap();
        assert_eq!(loaded.records(), snapshot.records());
        assert_eq!(loaded.captured_at(), snapshot.captured_at());
        assert_eq!(loaded.digest(), snapshot.digest());
    }

    #[test]
    fn test_msgpack_store_readable_by_json_store() {
        let dir = TempDir::new().unwrap();
        let writer = FileSnapshotStore::new(dir.path(), 4, SnapshotEncoding::Msgpack).unwrap();
        writer.store(&sample(2)).unwrap();

        let reader = FileSnapshotStore::new(dir.path(), 4, SnapshotEncoding::Json).unwrap();
        let loaded = reader.retrieve(day(2)).unwrap();
        assert_eq!(loaded.records(), sample(2).records());
    }

    #[test]
    fn test_missing_date_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = FileSnapshotStore::new(dir.path(), 4, SnapshotEncoding::Json).unwrap();
        assert!(matches!(store.retrieve(day(9)), Err(TrackerError::NotFound(_))));
        assert!(!store.exists(day(9)).unwrap());
    }

    #[test]
    fn test_corrupted_payload_detected() {
        let dir = TempDir::new().unwrap();
        let store = FileSnapshotStore::new(dir.path(), 4, SnapshotEncoding::Json).unwrap();
        store.store(&sample(3)).unwrap();

        let path = store.snapshot_path(day(3));
        let mut bytes = fs::read(&path).unwrap();
        let middle = bytes.len() / 2;
        bytes[middle] ^= 0xff;
        fs::write(&path, bytes).unwrap();

        let reader = FileSnapshotStore::new(dir.path(), 4, SnapshotEncoding::Json).unwrap();
        assert!(matches!(
            reader.retrieve(day(3)),
            Err(TrackerError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_bad_magic_rejected() {
        let dir = TempDir::new().unwrap();
        let store = FileSnapshotStore::new(dir.path(), 4, SnapshotEncoding::Json).unwrap();
        fs::write(store.snapshot_path(day(4)), b"JUNKJUNKJUNK").unwrap();
        assert!(matches!(store.retrieve(day(4)), Err(TrackerError::InvalidFormat(_))));
    }

    #[test]
    fn test_dates_and_purge() {
        let dir = TempDir::new().unwrap();
        let store = FileSnapshotStore::new(dir.path(), 4, SnapshotEncoding::Json).unwrap();
        for d in [1, 2, 3] {
            store.store(&sample(d)).unwrap();
        }
        fs::write(dir.path().join("notes.txt"), b"ignored").unwrap();
        fs::write(dir.path().join("inventory_garbage.snap"), b"ignored").unwrap();

        assert_eq!(store.dates().unwrap(), vec![day(1), day(2), day(3)]);

        let purged = store.purge_before(day(3)).unwrap();
        assert_eq!(purged, 2);
        assert_eq!(store.dates().unwrap(), vec![day(3)]);
        assert!(matches!(store.retrieve(day(1)), Err(TrackerError::NotFound(_))));
        assert!(dir.path().join("notes.txt").exists());
    }

    #[test]
    fn test_restore_replaces_snapshot() {
        let dir = TempDir::new().unwrap();
        let store = FileSnapshotStore::new(dir.path(), 4, SnapshotEncoding::Json).unwrap();
        store.store(&sample(5)).unwrap();

        let replacement = Snapshot::new(
            day(5),
            Utc::now(),
            vec![InventoryRecord::new("9", "Z", Some("W9"), 1, ItemStatus::Active)],
        )
        .unwrap();
        store.store(&replacement).unwrap();

        let reader = FileSnapshotStore::new(dir.path(), 4, SnapshotEncoding::Json).unwrap();
        assert_eq!(reader.retrieve(day(5)).unwrap().records()[0].item_id, "9");
    }

    #[test]
    fn test_cached_reader_sees_other_writers() {
        let dir = TempDir::new().unwrap();
        let reader = FileSnapshotStore::new(dir.path(), 4, SnapshotEncoding::Json).unwrap();
        let writer = FileSnapshotStore::new(dir.path(), 4, SnapshotEncoding::Json).unwrap();

        writer.store(&sample(7)).unwrap();
        assert_eq!(reader.retrieve(day(7)).unwrap().len(), 2);

        let replacement = Snapshot::new(
            day(7),
            Utc::now(),
            vec![InventoryRecord::new("9", "Z", Some("W9"), 1, ItemStatus::Active)],
        )
        .unwrap();
        writer.store(&replacement).unwrap();
        assert_eq!(reader.retrieve(day(7)).unwrap().records(), replacement.records());

        writer.purge_before(day(8)).unwrap();
        assert!(!reader.exists(day(7)).unwrap());
        assert!(matches!(reader.retrieve(day(7)), Err(TrackerError::NotFound(_))));
    }

    #[test]
    fn test_writer_lock_held_elsewhere() {
        let dir = TempDir::new().unwrap();
        let store = FileSnapshotStore::new(dir.path(), 4, SnapshotEncoding::Json).unwrap();

        let other = File::create(dir.path().join("LOCK")).unwrap();
        other.lock_exclusive().unwrap();

        assert!(matches!(store.store(&sample(6)), Err(TrackerError::Locked)));

        other.unlock().unwrap();
        store.store(&sample(6)).unwrap();
    }
}
