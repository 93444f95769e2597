//! Active stock lines with nothing on hand.

use crate::types::Snapshot;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZeroStockItem {
    pub item_id: String,
    pub item_number: String,
    pub name: Option<String>,
    pub warehouse_id: Option<String>,
    pub warehouse_name: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZeroStockReport {
    pub items: Vec<ZeroStockItem>,
}

impl ZeroStockReport {
    pub fn count(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Every active record with quantity zero, in snapshot order.
pub fn detect_zero_stock(snapshot: &Snapshot) -> ZeroStockReport {
    let items: Vec<ZeroStockItem> = snapshot
        .iter()
        .filter(|r| r.is_zero_stock())
        .map(|r| ZeroStockItem {
            item_id: r.item_id.clone(),
            item_number: r.item_number.clone(),
            name: r.name.clone(),
            warehouse_id: r.warehouse_id.clone(),
            warehouse_name: r.warehouse_name.clone(),
        })
        .collect();

    tracing::debug!(date = %snapshot.date(), count = items.len(), "detected zero stock");

    ZeroStockReport { items }
}
