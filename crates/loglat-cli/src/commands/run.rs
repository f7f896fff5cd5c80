use crate::OutputFormat;
use anyhow::Result;
use loglat_core::{AnalyzerConfig, Pipeline, RunOutcome};

/// Run the pipeline once and return how it ended
pub fn run_pipeline(config: AnalyzerConfig) -> Result<RunOutcome> {
    tracing::info!(
        log_dir = %config.log_dir.display(),
        report_dir = %config.report_dir.display(),
        report_size = config.report_size,
        error_threshold = config.error_threshold,
        "Starting analysis"
    );

    let outcome = Pipeline::new(config).run()?;
    Ok(outcome)
}

pub fn execute(config: AnalyzerConfig, format: OutputFormat) -> Result<()> {
    let outcome = run_pipeline(config)?;

    match format {
        OutputFormat::Json => output_json(&outcome)?,
        OutputFormat::Table => output_table(&outcome),
        OutputFormat::Pretty => output_pretty(&outcome),
    }

    Ok(())
}

fn output_pretty(outcome: &RunOutcome) {
    use console::style;

    match outcome {
        RunOutcome::NoLogFound { log_dir } => {
            println!(
                "{} no access logs found in {}",
                style("Nothing to do:").bold().yellow(),
                log_dir.display()
            );
        }
        RunOutcome::Skipped { log, report_path } => {
            println!(
                "{} report for {} already exists at {}",
                style("Skipped:").bold().yellow(),
                log.date,
                report_path.display()
            );
        }
        RunOutcome::Rendered {
            log,
            report_path,
            summary,
        } => {
            println!("\n{}", style("Latency Report").bold().cyan());
            println!("{}", style("==============").cyan());
            println!("  Log File:         {}", log.path.display());
            println!("  Log Date:         {}", log.date);
            println!("  Lines:            {}", summary.total_lines);
            println!(
                "  Unparsed:         {} ({:.2}%)",
                summary.failed_lines,
                summary.failure_ratio * 100.0
            );
            println!("  Distinct URLs:    {}", summary.total_urls);
            println!("  Rows in Report:   {}", summary.rows);
            println!(
                "\n{} {}",
                style("Report written:").bold().green(),
                report_path.display()
            );
            println!();
        }
    }
}

fn output_json(outcome: &RunOutcome) -> Result<()> {
    let json = serde_json::to_string_pretty(outcome)?;
    println!("{}", json);
    Ok(())
}

fn output_table(outcome: &RunOutcome) {
    println!("Metric,Value");
    match outcome {
        RunOutcome::NoLogFound { log_dir } => {
            println!("Status,no_log_found");
            println!("Log Directory,{}", log_dir.display());
        }
        RunOutcome::Skipped { log, report_path } => {
            println!("Status,skipped");
            println!("Log File,{}", log.path.display());
            println!("Report,{}", report_path.display());
        }
        RunOutcome::Rendered {
            log,
            report_path,
            summary,
        } => {
            println!("Status,rendered");
            println!("Log File,{}", log.path.display());
            println!("Report,{}", report_path.display());
            println!("Lines,{}", summary.total_lines);
            println!("Unparsed Lines,{}", summary.failed_lines);
            println!("Distinct URLs,{}", summary.total_urls);
            println!("Rows,{}", summary.rows);
        }
    }
}
