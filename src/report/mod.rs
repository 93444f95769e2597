//! Daily and trend reports built from stored snapshots.

mod daily;
mod format;
mod generator;

pub use daily::{build_daily_report, previous_snapshot, DailyReport};
pub use format::{
    format, FormatMode, FormattedView, ReportMetadata, ReportSummary, SummaryView, Table, TableView,
};
pub use generator::{ReportGenerator, TrendReport};
