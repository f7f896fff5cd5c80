pub mod completion;
pub mod locate;
pub mod run;

use anyhow::{Context, Result};
use clap::Args;
use loglat_core::AnalyzerConfig;
use std::path::PathBuf;

/// Options shared by commands that need the run configuration
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Path to a TOML config file (defaults are used when omitted)
    #[arg(short, long, value_name = "FILE", env = "LOGLAT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the directory scanned for access logs
    #[arg(long, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    /// Override the directory reports are written to
    #[arg(long, value_name = "DIR")]
    pub report_dir: Option<PathBuf>,

    /// Override the number of URLs kept in the report
    #[arg(long, value_name = "N")]
    pub report_size: Option<usize>,
}

impl ConfigArgs {
    /// Load the config file (or defaults) and apply command-line overrides
    pub fn load(&self) -> Result<AnalyzerConfig> {
        let mut config = match &self.config {
            Some(path) => AnalyzerConfig::load(path)
                .with_context(|| format!("Config error in {}", path.display()))?,
            None => AnalyzerConfig::default(),
        };

        if let Some(dir) = &self.log_dir {
            config.log_dir = dir.clone();
        }
        if let Some(dir) = &self.report_dir {
            config.report_dir = dir.clone();
        }
        if let Some(size) = self.report_size {
            config.report_size = size;
        }

        config.validate()?;
        Ok(config)
    }
}
