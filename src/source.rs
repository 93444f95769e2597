//! Inventory data sources.
//!
//! The tracker never talks to a database directly. It asks a [`DataSource`]
//! for the current rows, one map per stock line, with the column names
//! produced by [`SqlDialect::inventory_query`].

use crate::config::DatabaseKind;
use crate::error::{Result, TrackerError};
use crate::types::SourceRow;
use parking_lot::Mutex;

/// Something that can produce today's inventory rows.
pub trait DataSource: Send + Sync {
    /// Fetch every item joined with its stock lines.
    ///
    /// Connection or query failures are `SourceUnavailable`.
    fn fetch_inventory(&self) -> Result<Vec<SourceRow>>;
}

/// SQL flavour of the inventory database.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SqlDialect {
    MySql,
    MsSql,
}

impl SqlDialect {
    /// Query returning one row per item and warehouse.
    ///
    /// Items without stock lines still appear once, with a null warehouse and
    /// zero quantity.
    pub fn inventory_query(&self) -> String {
        let null_to_zero = match self {
            SqlDialect::MySql => "COALESCE",
            SqlDialect::MsSql => "ISNULL",
        };
        format!(
            "SELECT \
                a.artikel_id AS item_id, \
                a.artikelnummer AS item_number, \
                a.bezeichnung AS name, \
                a.hersteller AS manufacturer, \
                a.kategorie AS category, \
                a.status AS status, \
                {null_to_zero}(l.bestand, 0) AS quantity, \
                l.lager_id AS warehouse_id, \
                l.lager_name AS warehouse_name \
            FROM artikel a \
            LEFT JOIN lagerbestand l ON a.artikel_id = l.artikel_id \
            ORDER BY a.artikelnummer"
        )
    }
}

impl From<DatabaseKind> for SqlDialect {
    fn from(kind: DatabaseKind) -> Self {
        match kind {
            DatabaseKind::Mysql => SqlDialect::MySql,
            DatabaseKind::Mssql => SqlDialect::MsSql,
        }
    }
}

/// A source serving fixed rows, optionally failing a set number of times first.
pub struct StaticSource {
    rows: Vec<SourceRow>,
    failures_left: Mutex<u32>,
}

impl StaticSource {
    pub fn new(rows: Vec<SourceRow>) -> Self {
        Self {
            rows,
            failures_left: Mutex::new(0),
        }
    }

    /// Fail the first `failures` fetches with `SourceUnavailable`.
    pub fn failing(rows: Vec<SourceRow>, failures: u32) -> Self {
        Self {
            rows,
            failures_left: Mutex::new(failures),
        }
    }

    /// Rows from a JSON array of objects.
    pub fn from_json(json: &str) -> Result<Self> {
        let rows: Vec<SourceRow> = serde_json::from_str(json)
            .map_err(|e| TrackerError::Deserialization(e.to_string()))?;
        Ok(Self::new(rows))
    }

    pub fn remaining_failures(&self) -> u32 {
        *self.failures_left.lock()
    }
}

impl DataSource for StaticSource {
    fn fetch_inventory(&self) -> Result<Vec<SourceRow>> {
        let mut failures_left = self.failures_left.lock();
        if *failures_left > 0 {
            *failures_left -= 1;
            return Err(TrackerError::SourceUnavailable(
                "connection refused".to_string(),
            ));
        }
        Ok(self.rows.clone())
    }
}
