use super::ReportRenderer;
use crate::analysis::{AggregateReport, UrlStats};
use crate::{Error, Result};
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Marker in the template replaced by the JSON row array
pub const TABLE_PLACEHOLDER: &str = "$table_json";

const BUILTIN_TEMPLATE: &str = include_str!("../../templates/report.html");

/// One table row as written into the report, values rounded for display
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow<'a> {
    pub url: &'a str,
    pub count: u64,
    pub count_perc: f64,
    pub time_sum: f64,
    pub time_perc: f64,
    pub time_avg: f64,
    pub time_max: f64,
    pub time_med: f64,
}

impl<'a> From<&'a UrlStats> for ReportRow<'a> {
    fn from(stats: &'a UrlStats) -> Self {
        Self {
            url: &stats.url,
            count: stats.count,
            count_perc: round3(stats.count_perc),
            time_sum: round3(stats.time_sum),
            time_perc: round3(stats.time_perc),
            time_avg: round3(stats.time_avg),
            time_max: round3(stats.time_max),
            time_med: round3(stats.time_med),
        }
    }
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Substitutes the table data into an HTML template
#[derive(Debug, Clone)]
pub struct HtmlReportRenderer {
    template: String,
}

impl HtmlReportRenderer {
    pub fn new(template: impl Into<String>) -> Self {
        let template = template.into();
        if !template.contains(TABLE_PLACEHOLDER) {
            tracing::warn!(
                "Report template has no {} placeholder; rows will not appear",
                TABLE_PLACEHOLDER
            );
        }
        Self { template }
    }

    /// Template bundled with the crate
    pub fn builtin() -> Self {
        Self::new(BUILTIN_TEMPLATE)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        tracing::debug!("Reading report template from: {}", path.display());

        let template = fs::read_to_string(path).map_err(|source| Error::TemplateUnreadable {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(template))
    }

    /// Explicit template if given, else `fallback` when it exists, else the builtin
    pub fn resolve(explicit: Option<&Path>, fallback: &Path) -> Result<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None if fallback.is_file() => Self::from_file(fallback),
            None => {
                tracing::debug!("Using built-in report template");
                Ok(Self::builtin())
            }
        }
    }

    /// Render the report document to a string
    pub fn to_html(&self, report: &AggregateReport) -> Result<String> {
        let rows: Vec<ReportRow<'_>> = report.rows.iter().map(ReportRow::from).collect();
        let table_json = serde_json::to_string(&rows)?;
        Ok(self.template.replace(TABLE_PLACEHOLDER, &table_json))
    }
}

impl ReportRenderer for HtmlReportRenderer {
    /// Writes to a temporary file next to `target` and renames it into place,
    /// so `target` is either absent or complete. An existing `target` is never replaced.
    fn render(&self, report: &AggregateReport, target: &Path) -> Result<()> {
        tracing::debug!("Writing report to: {}", target.display());

        let html = self.to_html(report)?;
        let write_err = |source| Error::RenderWrite {
            path: target.to_path_buf(),
            source,
        };

        let dir = target
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut tmp = NamedTempFile::new_in(dir).map_err(write_err)?;
        tmp.write_all(html.as_bytes()).map_err(write_err)?;
        tmp.as_file().sync_all().map_err(write_err)?;
        tmp.persist_noclobber(target)
            .map_err(|e| write_err(e.error))?;

        tracing::info!(
            "Successfully wrote report with {} rows to {}",
            report.rows.len(),
            target.display()
        );

        Ok(())
    }
}
