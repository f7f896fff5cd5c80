use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use loglat_cli::OutputFormat;
use loglat_cli::commands::{self, ConfigArgs};
use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

#[derive(Parser)]
#[command(name = "loglat")]
#[command(author, version, about, long_about = None)]
#[command(
    about = "Build latency reports from nginx access logs",
    long_about = "loglat finds the most recent access log in a directory (plain or gzip), \
                  aggregates request time per URL and renders a sortable HTML report. \
                  Dates that already have a report are skipped."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format for the run summary
    #[arg(short, long, global = true, value_enum, default_value = "pretty")]
    format: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze the latest log and render its report
    Run(ConfigArgs),

    /// Show which log would be analyzed without parsing it
    Locate(ConfigArgs),

    /// Generate shell completion scripts
    #[command(after_help = "SUPPORTED SHELLS: bash, zsh, fish, powershell, elvish\n\n\
                            INSTALLATION:\n  \
                            bash: loglat completion --shell bash >> ~/.bashrc\n  \
                            zsh:  loglat completion --shell zsh > ~/.zfunc/_loglat")]
    Completion {
        /// Shell to generate completions for
        #[arg(long, value_enum)]
        shell: Shell,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => {
            let config = args.load()?;
            init_logging(cli.verbose, config.log_file.as_deref())?;
            commands::run::execute(config, cli.format).inspect_err(log_failure)
        }
        Commands::Locate(args) => {
            let config = args.load()?;
            init_logging(cli.verbose, config.log_file.as_deref())?;
            commands::locate::execute(config, cli.format).inspect_err(log_failure)
        }
        Commands::Completion { shell } => {
            init_logging(cli.verbose, None)?;
            commands::completion::execute(shell, &mut Cli::command())
        }
    }
}

/// Record a fatal error in the diagnostic log before it is reported on stderr
fn log_failure(err: &anyhow::Error) {
    tracing::error!(error = %format!("{:#}", err), "Run failed");
}

/// Console logging on stderr, or JSON lines appended to `log_file` when configured
fn init_logging(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("loglat=debug,loglat_cli=debug,loglat_core=debug")
    } else {
        EnvFilter::new("loglat=info,loglat_cli=info,loglat_core=info")
    };

    match log_file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;

            tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr)
                .init();
        }
    }

    Ok(())
}
