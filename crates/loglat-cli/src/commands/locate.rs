use crate::OutputFormat;
use anyhow::Result;
use loglat_core::log::LogFileRef;
use loglat_core::{AnalyzerConfig, Pipeline};
use serde::Serialize;
use std::path::PathBuf;

/// Which log a run would pick and where its report would go
#[derive(Debug, Clone, Serialize)]
pub struct LocateResult {
    pub log_dir: PathBuf,
    pub log: Option<LogFileRef>,
    pub report_path: Option<PathBuf>,
    pub report_exists: bool,
}

pub fn locate(config: AnalyzerConfig) -> Result<LocateResult> {
    let pipeline = Pipeline::new(config);
    let log = pipeline.locate()?;
    let report_path = log.as_ref().map(|l| pipeline.report_path_for(l));
    let report_exists = report_path.as_ref().is_some_and(|p| p.exists());

    Ok(LocateResult {
        log_dir: pipeline.config().log_dir.clone(),
        log,
        report_path,
        report_exists,
    })
}

pub fn execute(config: AnalyzerConfig, format: OutputFormat) -> Result<()> {
    let result = locate(config)?;

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    match (&result.log, &result.report_path) {
        (Some(log), Some(report_path)) => {
            println!("Log:    {}", log.path.display());
            println!("Date:   {}", log.date);
            println!(
                "Report: {}{}",
                report_path.display(),
                if result.report_exists {
                    " (exists, run will skip)"
                } else {
                    ""
                }
            );
        }
        _ => println!("No access logs found in {}", result.log_dir.display()),
    }

    Ok(())
}
