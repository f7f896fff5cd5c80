mod renderer;

pub use renderer::{HtmlReportRenderer, ReportRow, TABLE_PLACEHOLDER};

use crate::Result;
use crate::analysis::AggregateReport;
use chrono::NaiveDate;
use std::path::{Path, PathBuf};

/// Renders ranked rows into a report file at `target`
pub trait ReportRenderer {
    fn render(&self, report: &AggregateReport, target: &Path) -> Result<()>;
}

/// Deterministic report name for a log date, e.g. `report-2017.06.30.html`
pub fn report_file_name(date: NaiveDate) -> String {
    format!("report-{}.html", date.format("%Y.%m.%d"))
}

pub fn report_path(report_dir: &Path, date: NaiveDate) -> PathBuf {
    report_dir.join(report_file_name(date))
}
