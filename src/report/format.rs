//! Presentation views of a daily report.

use super::daily::DailyReport;
use crate::error::TrackerError;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormatMode {
    Table,
    Summary,
    Detailed,
}

impl FromStr for FormatMode {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "table" => Ok(FormatMode::Table),
            "summary" => Ok(FormatMode::Summary),
            "detailed" => Ok(FormatMode::Detailed),
            other => Err(TrackerError::Config(format!("unknown format mode: {}", other))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ReportMetadata {
    pub date: NaiveDate,
    pub generated_at: DateTime<Utc>,
}

/// A titled grid of display cells.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Table {
    pub title: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    fn new(title: &str, headers: &[&str], rows: Vec<Vec<String>>) -> Self {
        Self {
            title: title.to_string(),
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TableView {
    pub metadata: ReportMetadata,
    /// Keyed by section: `zero_inventory`, `changes`, `deactivations`.
    pub tables: BTreeMap<String, Table>,
}

/// Scalar counts per report section. Sections absent from the report are
/// absent here too.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ReportSummary {
    pub total_items: usize,
    pub active_items: usize,
    pub zero_stock_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub increased: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decreased: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unchanged: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub significant_changes_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deactivated_items: Option<usize>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SummaryView {
    pub date: NaiveDate,
    pub generated_at: DateTime<Utc>,
    pub summary: ReportSummary,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FormattedView {
    Table(TableView),
    Summary(SummaryView),
    Detailed(DailyReport),
}

/// Reshape a report for display.
pub fn format(report: &DailyReport, mode: FormatMode) -> FormattedView {
    match mode {
        FormatMode::Table => FormattedView::Table(as_table(report)),
        FormatMode::Summary => FormattedView::Summary(as_summary(report)),
        FormatMode::Detailed => FormattedView::Detailed(report.clone()),
    }
}

fn text(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn as_table(report: &DailyReport) -> TableView {
    let mut tables = BTreeMap::new();

    tables.insert(
        "zero_inventory".to_string(),
        Table::new(
            "Items with zero stock",
            &["Item ID", "Item Number", "Name", "Warehouse"],
            report
                .zero_stock
                .items
                .iter()
                .map(|item| {
                    vec![
                        item.item_id.clone(),
                        item.item_number.clone(),
                        text(&item.name),
                        text(&item.warehouse_name),
                    ]
                })
                .collect(),
        ),
    );

    if let Some(changes) = &report.changes {
        tables.insert(
            "changes".to_string(),
            Table::new(
                "Significant stock changes",
                &["Item Number", "Name", "Previous", "Current", "Change", "Change (%)"],
                changes
                    .significant_changes
                    .iter()
                    .map(|change| {
                        vec![
                            change.item_number.clone(),
                            text(&change.name),
                            change.quantity_previous.to_string(),
                            change.quantity_current.to_string(),
                            change.delta.to_string(),
                            format!("{:.2}%", change.delta_percent),
                        ]
                    })
                    .collect(),
            ),
        );
    }

    if let Some(deactivations) = &report.deactivations {
        tables.insert(
            "deactivations".to_string(),
            Table::new(
                "Deactivated items",
                &["Item ID", "Item Number", "Name"],
                deactivations
                    .items
                    .iter()
                    .map(|item| vec![item.item_id.clone(), item.item_number.clone(), text(&item.name)])
                    .collect(),
            ),
        );
    }

    TableView {
        metadata: ReportMetadata {
            date: report.date,
            generated_at: report.generated_at,
        },
        tables,
    }
}

fn as_summary(report: &DailyReport) -> SummaryView {
    let mut summary = ReportSummary {
        total_items: report.total_items,
        active_items: report.active_items,
        zero_stock_count: report.zero_stock.count(),
        ..Default::default()
    };

    if let Some(changes) = &report.changes {
        summary.increased = Some(changes.increased);
        summary.decreased = Some(changes.decreased);
        summary.unchanged = Some(changes.unchanged);
        summary.significant_changes_count = Some(changes.significant_count());
    }

    if let Some(deactivations) = &report.deactivations {
        summary.deactivated_items = Some(deactivations.count());
    }

    SummaryView {
        date: report.date,
        generated_at: report.generated_at,
        summary,
    }
}
