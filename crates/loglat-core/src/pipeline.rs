use crate::analysis::{AggregateReport, Aggregator};
use crate::config::AnalyzerConfig;
use crate::log::{LineParser, LineSource, LogFileRef, LogLocator};
use crate::report::{self, HtmlReportRenderer, ReportRenderer};
use crate::{Error, Result};
use serde::Serialize;
use std::fs;
use std::path::PathBuf;

/// Totals of a rendered run, for the CLI summary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub total_lines: u64,
    pub failed_lines: u64,
    pub failure_ratio: f64,
    pub total_requests: u64,
    pub total_urls: usize,
    pub rows: usize,
}

impl From<&AggregateReport> for RunSummary {
    fn from(report: &AggregateReport) -> Self {
        Self {
            total_lines: report.budget.total_lines,
            failed_lines: report.budget.failed_lines,
            failure_ratio: report.budget.failure_ratio(),
            total_requests: report.total_requests,
            total_urls: report.total_urls,
            rows: report.rows.len(),
        }
    }
}

/// How a successful run ended
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    /// No file in the log directory matched; nothing to do
    NoLogFound { log_dir: PathBuf },
    /// A report for the log's date already exists and was left untouched
    Skipped {
        log: LogFileRef,
        report_path: PathBuf,
    },
    Rendered {
        log: LogFileRef,
        report_path: PathBuf,
        summary: RunSummary,
    },
}

/// Locate → stream → parse → aggregate → gate → render, once per invocation.
pub struct Pipeline {
    config: AnalyzerConfig,
    locator: LogLocator,
    renderer: Option<Box<dyn ReportRenderer>>,
}

impl Pipeline {
    /// Pipeline rendering through the configured HTML template
    pub fn new(config: AnalyzerConfig) -> Self {
        let locator = LogLocator::new(config.log_prefix.clone());
        Self {
            config,
            locator,
            renderer: None,
        }
    }

    pub fn with_renderer(mut self, renderer: impl ReportRenderer + 'static) -> Self {
        self.renderer = Some(Box::new(renderer));
        self
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn locate(&self) -> Result<Option<LogFileRef>> {
        self.locator.locate(&self.config.log_dir)
    }

    pub fn report_path_for(&self, log: &LogFileRef) -> PathBuf {
        report::report_path(&self.config.report_dir, log.date)
    }

    /// Parse and aggregate a located log, applying the error-rate gate
    pub fn aggregate(&self, log: &LogFileRef) -> Result<AggregateReport> {
        let source = LineSource::open(log)?;
        aggregate_lines(source, self.config.report_size, self.config.error_threshold)
    }

    pub fn run(&self) -> Result<RunOutcome> {
        let Some(log) = self.locate()? else {
            tracing::info!(
                log_dir = %self.config.log_dir.display(),
                "No log files found, nothing to do"
            );
            return Ok(RunOutcome::NoLogFound {
                log_dir: self.config.log_dir.clone(),
            });
        };

        let report_path = self.report_path_for(&log);
        if report_path.exists() {
            tracing::info!(
                report = %report_path.display(),
                "Report already exists, skipping"
            );
            return Ok(RunOutcome::Skipped { log, report_path });
        }

        // Resolve the template up front so a bad template fails before the log is read
        let html;
        let renderer: &dyn ReportRenderer = match &self.renderer {
            Some(renderer) => renderer.as_ref(),
            None => {
                html = HtmlReportRenderer::resolve(
                    self.config.template_path.as_deref(),
                    &self.config.template_candidate(),
                )?;
                &html
            }
        };

        let report = self.aggregate(&log)?;

        fs::create_dir_all(&self.config.report_dir).map_err(|source| Error::RenderWrite {
            path: self.config.report_dir.clone(),
            source,
        })?;

        renderer.render(&report, &report_path)?;

        tracing::info!(report = %report_path.display(), "Report rendered");

        Ok(RunOutcome::Rendered {
            summary: RunSummary::from(&report),
            log,
            report_path,
        })
    }
}

/// Feed every non-blank line through the parser into an aggregator, gate, then finalize
pub fn aggregate_lines(mut source: LineSource, top_n: usize, threshold: f64) -> Result<AggregateReport> {
    let mut aggregator = Aggregator::new();
    let mut blank_lines = 0u64;

    while let Some(line) = source.next_line()? {
        if line.trim().is_empty() {
            blank_lines += 1;
            continue;
        }
        aggregator.record(LineParser::parse(&line));
    }

    let budget = aggregator.budget();
    tracing::info!(
        read = source.lines_read(),
        lines = budget.total_lines,
        failed = budget.failed_lines,
        blank = blank_lines,
        "Processed log lines"
    );

    budget.check(threshold)?;
    Ok(aggregator.finalize(top_n))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::cell::Cell;
    use std::io::Write;
    use std::path::Path;
    use std::rc::Rc;

    const LOG_NAME: &str = "nginx-access-ui.log-20170630";

    fn line(url: &str, duration: &str) -> String {
        format!(
            r#"1.196.116.32 -  - [29/Jun/2017:03:50:22 +0300] "GET {url} HTTP/1.1" 200 927 "-" "Lynx/2.8.8dev.9" "-" "1498697422-2190034393-4708-9752759" "dc7161be3" {duration}"#
        )
    }

    fn sample_log() -> String {
        [
            line("/api/v2/banner/1", "0.390"),
            line("/api/v2/banner/1", "0.133"),
            line("/api/v2/slot/4705/groups", "0.704"),
            line("/api/1/photogenic_banners/list/?server_name=WIN7RB4", "0.146"),
            String::new(),
            line("/api/v2/slot/4705/groups", "0.062"),
        ]
        .join("\n")
            + "\n"
    }

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    struct Fixture {
        _dir: tempfile::TempDir,
        config: AnalyzerConfig,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let log_dir = dir.path().join("log");
        fs::create_dir(&log_dir).unwrap();
        let config = AnalyzerConfig {
            log_dir,
            report_dir: dir.path().join("reports"),
            ..AnalyzerConfig::default()
        };
        Fixture { _dir: dir, config }
    }

    fn write_log(config: &AnalyzerConfig, name: &str, content: &[u8]) {
        fs::write(config.log_dir.join(name), content).unwrap();
    }

    /// Counts render calls and writes a marker file
    struct CountingRenderer(Rc<Cell<usize>>);

    impl ReportRenderer for CountingRenderer {
        fn render(&self, report: &AggregateReport, target: &Path) -> Result<()> {
            self.0.set(self.0.get() + 1);
            fs::write(target, format!("{} rows", report.rows.len())).unwrap();
            Ok(())
        }
    }

    #[test]
    fn test_run_renders_report() {
        let fx = fixture();
        write_log(&fx.config, LOG_NAME, sample_log().as_bytes());

        let outcome = Pipeline::new(fx.config.clone()).run().unwrap();
        match outcome {
            RunOutcome::Rendered {
                report_path,
                summary,
                ..
            } => {
                assert_eq!(
                    report_path,
                    fx.config.report_dir.join("report-2017.06.30.html")
                );
                assert_eq!(summary.total_lines, 5);
                assert_eq!(summary.failed_lines, 0);
                assert_eq!(summary.total_urls, 3);
                let html = fs::read_to_string(report_path).unwrap();
                assert!(html.contains("/api/v2/slot/4705/groups"));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_second_run_is_skipped_and_leaves_report_untouched() {
        let fx = fixture();
        write_log(&fx.config, LOG_NAME, sample_log().as_bytes());
        let calls = Rc::new(Cell::new(0));

        let pipeline = Pipeline::new(fx.config.clone()).with_renderer(CountingRenderer(calls.clone()));

        let first = pipeline.run().unwrap();
        let RunOutcome::Rendered { report_path, .. } = first else {
            panic!("first run should render, got {:?}", first);
        };
        let mtime = fs::metadata(&report_path).unwrap().modified().unwrap();

        let second = pipeline.run().unwrap();
        assert!(matches!(second, RunOutcome::Skipped { .. }));
        assert_eq!(calls.get(), 1);
        assert_eq!(
            fs::metadata(&report_path).unwrap().modified().unwrap(),
            mtime
        );
    }

    #[test]
    fn test_no_log_found_is_clean_outcome() {
        let fx = fixture();
        write_log(&fx.config, "notes.txt", b"hello");

        let outcome = Pipeline::new(fx.config.clone()).run().unwrap();
        assert!(matches!(outcome, RunOutcome::NoLogFound { .. }));
        assert!(!fx.config.report_dir.exists());
    }

    #[test]
    fn test_gate_rejects_mostly_garbage_log() {
        let fx = fixture();
        let mut lines: Vec<String> = (0..4).map(|i| line(&format!("/u/{i}"), "0.1")).collect();
        lines.extend((0..6).map(|i| format!("garbage line {i}")));
        write_log(&fx.config, LOG_NAME, lines.join("\n").as_bytes());

        let err = Pipeline::new(fx.config.clone()).run().unwrap_err();
        assert!(matches!(
            err,
            Error::ErrorRateExceeded {
                failed: 6,
                total: 10,
                ..
            }
        ));
        assert!(!fx.config.report_dir.join("report-2017.06.30.html").exists());
    }

    #[test]
    fn test_gate_allows_failures_at_threshold() {
        let fx = fixture();
        let mut lines: Vec<String> = (0..5).map(|i| line(&format!("/u/{i}"), "0.1")).collect();
        lines.extend((0..5).map(|i| format!("garbage line {i}")));
        write_log(&fx.config, LOG_NAME, lines.join("\n").as_bytes());

        let outcome = Pipeline::new(fx.config.clone()).run().unwrap();
        assert!(matches!(outcome, RunOutcome::Rendered { .. }));
    }

    #[test]
    fn test_plain_and_gzip_produce_identical_reports() {
        let fx = fixture();
        let content = sample_log();
        write_log(&fx.config, "nginx-access-ui.log-20170629", content.as_bytes());
        write_log(
            &fx.config,
            "nginx-access-ui.log-20170630.gz",
            &gzip(content.as_bytes()),
        );

        let pipeline = Pipeline::new(fx.config.clone());
        let locator = LogLocator::default();
        let plain = LogFileRef {
            path: fx.config.log_dir.join("nginx-access-ui.log-20170629"),
            date: locator.match_file_name("nginx-access-ui.log-20170629").unwrap().0,
            is_compressed: false,
        };
        let compressed = pipeline.locate().unwrap().unwrap();
        assert!(compressed.is_compressed);

        assert_eq!(
            pipeline.aggregate(&plain).unwrap(),
            pipeline.aggregate(&compressed).unwrap()
        );
    }

    #[test]
    fn test_unreadable_log_fails() {
        let fx = fixture();
        write_log(&fx.config, "nginx-access-ui.log-20170630.gz", b"not gzip at all");

        let err = Pipeline::new(fx.config.clone()).run().unwrap_err();
        assert!(matches!(err, Error::UnreadableFile { .. }));
        assert!(!fx.config.report_dir.join("report-2017.06.30.html").exists());
    }

    #[test]
    fn test_missing_explicit_template_fails_before_parsing() {
        let fx = fixture();
        write_log(&fx.config, LOG_NAME, sample_log().as_bytes());
        let config = AnalyzerConfig {
            template_path: Some(fx.config.log_dir.join("absent.html")),
            ..fx.config.clone()
        };

        let err = Pipeline::new(config).run().unwrap_err();
        assert!(matches!(err, Error::TemplateUnreadable { .. }));
    }

    #[test]
    fn test_report_size_limits_rows() {
        let fx = fixture();
        write_log(&fx.config, LOG_NAME, sample_log().as_bytes());
        let config = AnalyzerConfig {
            report_size: 1,
            ..fx.config.clone()
        };
        let pipeline = Pipeline::new(config);

        let log = pipeline.locate().unwrap().unwrap();
        let report = pipeline.aggregate(&log).unwrap();
        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.rows[0].url, "/api/v2/slot/4705/groups");
        assert_eq!(report.total_urls, 3);
    }
}
