//! Core types for inventory snapshots.

use crate::error::{Result, TrackerError};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fmt;

/// A flat row as returned by the data source or read back from storage.
pub type SourceRow = Map<String, Value>;

/// Lifecycle status of an item.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Active,
    Inactive,
}

impl ItemStatus {
    /// Parse a status value, accepting the source system's native spellings.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" | "aktiv" => Some(ItemStatus::Active),
            "inactive" | "inaktiv" => Some(ItemStatus::Inactive),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Active => "active",
            ItemStatus::Inactive => "inactive",
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Composite key identifying one stock line: an item in one warehouse.
///
/// Items without any stock line carry no warehouse.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StockKey {
    pub item_id: String,
    pub warehouse_id: Option<String>,
}

impl fmt::Debug for StockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StockKey({})", self)
    }
}

impl fmt::Display for StockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.warehouse_id {
            Some(wh) => write!(f, "{}@{}", self.item_id, wh),
            None => write!(f, "{}@-", self.item_id),
        }
    }
}

/// Content fingerprint of a snapshot (SHA-256 over its records).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SnapshotDigest(pub [u8; 32]);

impl SnapshotDigest {
    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string.
    pub fn from_hex(s: &str) -> std::result::Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| hex::FromHexError::InvalidStringLength)?;
        Ok(SnapshotDigest(arr))
    }
}

impl fmt::Debug for SnapshotDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SnapshotDigest({}...)", &self.to_hex()[..8])
    }
}

impl fmt::Display for SnapshotDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Serialize for SnapshotDigest {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for SnapshotDigest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        SnapshotDigest::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// One row of a snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InventoryRecord {
    pub item_id: String,
    pub item_number: String,
    pub name: Option<String>,
    pub manufacturer: Option<String>,
    pub category: Option<String>,
    pub status: ItemStatus,
    pub quantity: u64,
    pub warehouse_id: Option<String>,
    pub warehouse_name: Option<String>,
}

impl InventoryRecord {
    /// Create a record with only the fields needed for comparisons.
    pub fn new(
        item_id: impl Into<String>,
        item_number: impl Into<String>,
        warehouse_id: Option<&str>,
        quantity: u64,
        status: ItemStatus,
    ) -> Self {
        Self {
            item_id: item_id.into(),
            item_number: item_number.into(),
            name: None,
            manufacturer: None,
            category: None,
            status,
            quantity,
            warehouse_id: warehouse_id.map(str::to_string),
            warehouse_name: None,
        }
    }

    /// Set the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the category.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Set the warehouse display name.
    pub fn with_warehouse_name(mut self, name: impl Into<String>) -> Self {
        self.warehouse_name = Some(name.into());
        self
    }

    pub fn key(&self) -> StockKey {
        StockKey {
            item_id: self.item_id.clone(),
            warehouse_id: self.warehouse_id.clone(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == ItemStatus::Active
    }

    /// Active with nothing on hand.
    pub fn is_zero_stock(&self) -> bool {
        self.is_active() && self.quantity == 0
    }

    /// Decode a flat source row.
    ///
    /// `index` is the row position, reported back in `MalformedSnapshot`.
    pub fn from_row(row: &SourceRow, index: usize) -> Result<Self> {
        let malformed = |field| TrackerError::MalformedSnapshot { field, row: index };

        let item_id = row
            .get("item_id")
            .and_then(opaque_text)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| malformed("item_id"))?;

        let item_number = row
            .get("item_number")
            .and_then(opaque_text)
            .ok_or_else(|| malformed("item_number"))?;

        let status = row
            .get("status")
            .and_then(Value::as_str)
            .and_then(ItemStatus::parse)
            .ok_or_else(|| malformed("status"))?;

        let quantity = match row.get("quantity") {
            // The source coalesces missing stock to zero.
            Some(Value::Null) => 0,
            Some(value) => quantity_from(value).ok_or_else(|| malformed("quantity"))?,
            None => return Err(malformed("quantity")),
        };

        let warehouse_id = match row.get("warehouse_id") {
            Some(Value::Null) => None,
            Some(value) => Some(opaque_text(value).ok_or_else(|| malformed("warehouse_id"))?),
            None => return Err(malformed("warehouse_id")),
        };

        Ok(Self {
            item_id,
            item_number,
            name: optional_text(row, "name"),
            manufacturer: optional_text(row, "manufacturer"),
            category: optional_text(row, "category"),
            status,
            quantity,
            warehouse_id,
            warehouse_name: optional_text(row, "warehouse_name"),
        })
    }

    fn feed_digest(&self, hasher: &mut Sha256) {
        let quantity = self.quantity.to_string();
        let fields: [Option<&str>; 9] = [
            Some(&self.item_id),
            Some(&self.item_number),
            self.name.as_deref(),
            self.manufacturer.as_deref(),
            self.category.as_deref(),
            Some(self.status.as_str()),
            Some(&quantity),
            self.warehouse_id.as_deref(),
            self.warehouse_name.as_deref(),
        ];
        // A presence byte keeps `None` apart from `Some("")`.
        for field in fields {
            match field {
                Some(text) => {
                    hasher.update([1]);
                    hasher.update(text.as_bytes());
                }
                None => hasher.update([0]),
            }
            hasher.update([0x1f]);
        }
        hasher.update([0x1e]);
    }
}

/// Opaque identifiers arrive as text or as numbers depending on the source.
fn opaque_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn optional_text(row: &SourceRow, field: &str) -> Option<String> {
    row.get(field).and_then(opaque_text)
}

/// Largest stock quantity accepted from a row. Deltas between two days must
/// fit in an `i64`.
pub const MAX_QUANTITY: u64 = i64::MAX as u64;

fn quantity_from(value: &Value) -> Option<u64> {
    if let Some(q) = value.as_u64() {
        return (q <= MAX_QUANTITY).then_some(q);
    }
    // Decimal columns come through as floats.
    let q = value.as_f64()?;
    if q >= 0.0 && q.fract() == 0.0 && q < MAX_QUANTITY as f64 {
        Some(q as u64)
    } else {
        None
    }
}

/// Full set of inventory records for one calendar date.
///
/// Immutable once built; `(item_id, warehouse_id)` is unique within it.
#[derive(Clone, Debug)]
pub struct Snapshot {
    date: NaiveDate,
    captured_at: DateTime<Utc>,
    records: Vec<InventoryRecord>,
}

impl Snapshot {
    /// Build a snapshot, rejecting duplicate stock lines.
    pub fn new(
        date: NaiveDate,
        captured_at: DateTime<Utc>,
        records: Vec<InventoryRecord>,
    ) -> Result<Self> {
        let mut seen = HashSet::with_capacity(records.len());
        for record in &records {
            if !seen.insert((record.item_id.as_str(), record.warehouse_id.as_deref())) {
                return Err(TrackerError::DuplicateStockLine {
                    item_id: record.item_id.clone(),
                    warehouse_id: record.warehouse_id.clone(),
                });
            }
        }

        Ok(Self {
            date,
            captured_at,
            records,
        })
    }

    /// Decode source rows into a snapshot.
    pub fn from_rows(date: NaiveDate, captured_at: DateTime<Utc>, rows: &[SourceRow]) -> Result<Self> {
        let records = rows
            .iter()
            .enumerate()
            .map(|(i, row)| InventoryRecord::from_row(row, i))
            .collect::<Result<Vec<_>>>()?;
        Self::new(date, captured_at, records)
    }

    pub fn empty(date: NaiveDate, captured_at: DateTime<Utc>) -> Self {
        Self {
            date,
            captured_at,
            records: Vec::new(),
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    pub fn records(&self) -> &[InventoryRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, InventoryRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn active_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_active()).count()
    }

    pub fn zero_stock_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_zero_stock()).count()
    }

    /// A copy holding only the records of one category.
    pub fn restricted_to_category(&self, category: &str) -> Snapshot {
        Snapshot {
            date: self.date,
            captured_at: self.captured_at,
            records: self
                .records
                .iter()
                .filter(|r| r.category.as_deref() == Some(category))
                .cloned()
                .collect(),
        }
    }

    /// Fingerprint of the records in their stored order.
    pub fn digest(&self) -> SnapshotDigest {
        let mut hasher = Sha256::new();
        for record in &self.records {
            record.feed_digest(&mut hasher);
        }
        SnapshotDigest(hasher.finalize().into())
    }
}

impl<'a> IntoIterator for &'a Snapshot {
    type Item = &'a InventoryRecord;
    type IntoIter = std::slice::Iter<'a, InventoryRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
