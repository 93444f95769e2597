//! Active → inactive status transitions.

use crate::types::{ItemStatus, Snapshot};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// An item that was active in the previous snapshot and is inactive now.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deactivation {
    pub item_id: String,
    pub item_number: String,
    pub name: Option<String>,
    /// Warehouse of the current-side row that matched.
    pub warehouse_id: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeactivationReport {
    pub items: Vec<Deactivation>,
}

impl DeactivationReport {
    pub fn count(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Find items deactivated between `previous` and `current`.
///
/// Rows are joined on `item_id` alone (inner join), so every current-side
/// stock line of an item is paired with every previous-side line of it.
/// Items missing from either snapshot are ignored, and reactivations are
/// never reported. Output is ordered by item number.
pub fn detect_deactivations(current: &Snapshot, previous: &Snapshot) -> DeactivationReport {
    let mut previous_status: HashMap<&str, Vec<ItemStatus>> = HashMap::new();
    for record in previous {
        previous_status
            .entry(record.item_id.as_str())
            .or_default()
            .push(record.status);
    }

    let mut items = Vec::new();
    for record in current.iter().filter(|r| r.status == ItemStatus::Inactive) {
        let Some(statuses) = previous_status.get(record.item_id.as_str()) else {
            continue;
        };
        for _ in statuses.iter().filter(|s| **s == ItemStatus::Active) {
            items.push(Deactivation {
                item_id: record.item_id.clone(),
                item_number: record.item_number.clone(),
                name: record.name.clone(),
                warehouse_id: record.warehouse_id.clone(),
            });
        }
    }

    items.sort_by(|a, b| {
        (&a.item_number, &a.item_id, &a.warehouse_id).cmp(&(&b.item_number, &b.item_id, &b.warehouse_id))
    });

    tracing::debug!(date = %current.date(), count = items.len(), "detected deactivations");

    DeactivationReport { items }
}
