//! Property tests for the snapshot analysis functions.

use chrono::{NaiveDate, TimeZone, Utc};
use inventory_tracker::{
    classify_trend, compute_changes, compute_trend, detect_deactivations, detect_zero_stock,
    HighlightThreshold, InventoryRecord, ItemStatus, Snapshot, TrendLabel,
};
use proptest::collection::{btree_map, vec};
use proptest::prelude::*;
use std::collections::{BTreeMap, HashSet};

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 8, d).unwrap()
}

fn status() -> impl Strategy<Value = ItemStatus> {
    prop_oneof![Just(ItemStatus::Active), Just(ItemStatus::Inactive)]
}

/// Stock lines keyed by (item, warehouse), unique by construction.
fn lines(ids: std::ops::Range<u32>) -> impl Strategy<Value = BTreeMap<(u32, Option<u8>), (u64, ItemStatus)>> {
    btree_map(
        (ids, proptest::option::of(0u8..3)),
        (0u64..40, status()),
        0..30,
    )
}

fn snapshot(d: u32, lines: &BTreeMap<(u32, Option<u8>), (u64, ItemStatus)>) -> Snapshot {
    let records = lines
        .iter()
        .map(|(&(id, wh), &(quantity, status))| {
            let warehouse = wh.map(|w| format!("W{}", w));
            InventoryRecord::new(id.to_string(), format!("N{:03}", id), warehouse.as_deref(), quantity, status)
        })
        .collect();
    let captured_at = Utc.with_ymd_and_hms(2024, 8, d, 23, 0, 0).unwrap();
    Snapshot::new(day(d), captured_at, records).unwrap()
}

proptest! {
    #[test]
    fn zero_stock_is_exactly_active_empty_lines(lines in lines(0..20)) {
        let s = snapshot(2, &lines);
        let report = detect_zero_stock(&s);

        let expected: HashSet<_> = s
            .iter()
            .filter(|r| r.status == ItemStatus::Active && r.quantity == 0)
            .map(|r| r.key())
            .collect();
        let found: Vec<_> = report
            .items
            .iter()
            .map(|i| (i.item_id.clone(), i.warehouse_id.clone()))
            .collect();

        prop_assert_eq!(found.len(), expected.len());
        for (item_id, warehouse_id) in found {
            let record = s
                .iter()
                .find(|r| r.item_id == item_id && r.warehouse_id == warehouse_id)
                .unwrap();
            prop_assert!(expected.contains(&record.key()));
        }
    }

    #[test]
    fn disjoint_snapshots_are_all_new_or_removed(
        current in lines(0..50),
        previous in lines(100..150),
    ) {
        let c = snapshot(2, &current);
        let p = snapshot(1, &previous);
        let report = compute_changes(&c, &p, HighlightThreshold::new(0.001).unwrap());

        if c.is_empty() {
            prop_assert_eq!(report.total_items, 0);
        } else {
            prop_assert_eq!(report.total_items, current.len() + previous.len());
            prop_assert_eq!(report.increased + report.decreased + report.unchanged, report.total_items);
            for change in &report.significant_changes {
                let id: u32 = change.item_id.parse().unwrap();
                if id < 100 {
                    prop_assert_eq!(change.quantity_previous, 0);
                } else {
                    prop_assert_eq!(change.quantity_current, 0);
                }
            }
        }
    }

    #[test]
    fn comparing_a_snapshot_with_itself_is_quiet(
        lines in lines(0..30),
        threshold in 0.0001f64..1000.0,
    ) {
        let s = snapshot(3, &lines);
        let report = compute_changes(&s, &s, HighlightThreshold::new(threshold).unwrap());

        prop_assert!(report.significant_changes.is_empty());
        prop_assert_eq!(report.increased, 0);
        prop_assert_eq!(report.decreased, 0);
        prop_assert_eq!(report.unchanged, s.len());
    }

    #[test]
    fn reactivations_are_never_reported(
        current in lines(0..15),
        previous in lines(0..15),
    ) {
        let c = snapshot(2, &current);
        let p = snapshot(1, &previous);
        let report = detect_deactivations(&c, &p);

        for item in &report.items {
            prop_assert!(c.iter().any(|r| r.item_id == item.item_id && r.status == ItemStatus::Inactive));
            prop_assert!(p.iter().any(|r| r.item_id == item.item_id && r.status == ItemStatus::Active));
        }

        // Swapping the days turns deactivations into reactivations, which are ignored.
        let reversed = detect_deactivations(&p, &c);
        for item in &reversed.items {
            prop_assert!(p.iter().any(|r| r.item_id == item.item_id && r.status == ItemStatus::Inactive));
        }
    }

    #[test]
    fn deactivations_ignore_input_order(
        current in lines(0..15),
        previous in lines(0..15),
    ) {
        let c = snapshot(2, &current);
        let p = snapshot(1, &previous);

        let mut shuffled_records: Vec<_> = c.records().to_vec();
        shuffled_records.reverse();
        let shuffled = Snapshot::new(c.date(), c.captured_at(), shuffled_records).unwrap();

        prop_assert_eq!(detect_deactivations(&c, &p), detect_deactivations(&shuffled, &p));
    }

    #[test]
    fn trend_follows_first_and_last_active_count(first in 1usize..500, last in 0usize..600) {
        let label = classify_trend(first, last);
        let (first_f, last_f) = (first as f64, last as f64);
        let expected = if last_f > first_f * 1.05 {
            TrendLabel::Increasing
        } else if last_f < first_f * 0.95 {
            TrendLabel::Decreasing
        } else {
            TrendLabel::Stable
        };
        prop_assert_eq!(label, expected);
    }

    #[test]
    fn trend_is_deterministic(days in vec(lines(0..10), 0..6)) {
        let snapshots: Vec<_> = days
            .iter()
            .enumerate()
            .map(|(i, l)| snapshot(i as u32 + 1, l))
            .collect();

        let a = compute_trend(&snapshots, None);
        let b = compute_trend(&snapshots, None);
        prop_assert_eq!(&a, &b);
        prop_assert_eq!(a.dates.len(), snapshots.len());
        if snapshots.len() < 2 {
            prop_assert_eq!(a.trend, TrendLabel::Stable);
        }
    }
}

// --- Boundary Scenarios ---

fn active_snapshot(d: u32, active: usize) -> Snapshot {
    let records = (0..active)
        .map(|i| InventoryRecord::new(i.to_string(), format!("N{}", i), Some("W"), 1, ItemStatus::Active))
        .collect();
    Snapshot::new(day(d), Utc::now(), records).unwrap()
}

#[test]
fn test_trend_boundaries() {
    let cases = [
        (100, 105, TrendLabel::Stable),
        (100, 106, TrendLabel::Increasing),
        (100, 94, TrendLabel::Decreasing),
        (100, 95, TrendLabel::Stable),
    ];
    for (first, last, expected) in cases {
        let snapshots = [active_snapshot(1, first), active_snapshot(2, last)];
        assert_eq!(compute_trend(&snapshots, None).trend, expected, "{} -> {}", first, last);
    }
}

#[test]
fn test_sold_out_line_is_minus_hundred_percent() {
    let previous = Snapshot::new(
        day(1),
        Utc::now(),
        vec![InventoryRecord::new("1", "N1", Some("A"), 50, ItemStatus::Active)],
    )
    .unwrap();
    let current = Snapshot::new(
        day(2),
        Utc::now(),
        vec![InventoryRecord::new("1", "N1", Some("A"), 0, ItemStatus::Active)],
    )
    .unwrap();

    let report = compute_changes(&current, &previous, HighlightThreshold::new(10.0).unwrap());
    assert_eq!(report.significant_count(), 1);
    assert_eq!(report.significant_changes[0].delta, -50);
    assert_eq!(report.significant_changes[0].delta_percent, -100.0);
}

#[test]
fn test_item_in_two_warehouses_deactivates_twice() {
    let previous = Snapshot::new(
        day(1),
        Utc::now(),
        vec![InventoryRecord::new("1", "N1", Some("A"), 5, ItemStatus::Active)],
    )
    .unwrap();
    let current = Snapshot::new(
        day(2),
        Utc::now(),
        vec![
            InventoryRecord::new("1", "N1", Some("A"), 5, ItemStatus::Inactive),
            InventoryRecord::new("1", "N1", Some("B"), 2, ItemStatus::Inactive),
        ],
    )
    .unwrap();

    let report = detect_deactivations(&current, &previous);
    assert_eq!(report.count(), 2);
    let warehouses: Vec<_> = report.items.iter().map(|i| i.warehouse_id.as_deref()).collect();
    assert_eq!(warehouses, vec![Some("A"), Some("B")]);
}
