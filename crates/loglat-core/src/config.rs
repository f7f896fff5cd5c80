use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_REPORT_SIZE: usize = 100;
pub const DEFAULT_ERROR_THRESHOLD: f64 = 0.5;
pub const DEFAULT_LOG_PREFIX: &str = "nginx-access-ui.log-";

/// Run configuration, read once at startup and treated as immutable.
///
/// Every key is optional in the TOML file; missing keys keep their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalyzerConfig {
    /// Number of URL rows kept in the report
    pub report_size: usize,
    pub report_dir: PathBuf,
    pub log_dir: PathBuf,
    /// Destination for the tool's own diagnostic log (JSON lines)
    pub log_file: Option<PathBuf>,
    /// Maximum tolerated fraction of unparsable lines, within [0, 1]
    pub error_threshold: f64,
    /// Literal filename prefix preceding the YYYYMMDD date
    pub log_prefix: String,
    /// Explicit report template; falls back to `<report_dir>/report.html`
    pub template_path: Option<PathBuf>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            report_size: DEFAULT_REPORT_SIZE,
            report_dir: PathBuf::from("./reports"),
            log_dir: PathBuf::from("./log"),
            log_file: None,
            error_threshold: DEFAULT_ERROR_THRESHOLD,
            log_prefix: DEFAULT_LOG_PREFIX.to_string(),
            template_path: None,
        }
    }
}

impl AnalyzerConfig {
    /// Load a config file, resolving relative paths against its directory
    pub fn load(path: &Path) -> Result<Self> {
        tracing::debug!("Loading config from: {}", path.display());

        let content = std::fs::read_to_string(path).map_err(|source| Error::ConfigUnreadable {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::load_from_str(&content)?;

        let base = path.parent().unwrap_or_else(|| Path::new(""));
        Ok(config.resolve_paths(base))
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> Result<Self> {
        let config: AnalyzerConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.report_size == 0 {
            return Err(Error::InvalidConfig(
                "report_size must be > 0, got 0".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.error_threshold) {
            return Err(Error::InvalidConfig(format!(
                "error_threshold must be within [0, 1], got {}",
                self.error_threshold
            )));
        }
        if self.log_prefix.is_empty() {
            return Err(Error::InvalidConfig(
                "log_prefix must be non-empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Rebase every relative path onto `base`
    pub fn resolve_paths(mut self, base: &Path) -> Self {
        let rebase = |p: &Path| {
            if p.is_relative() {
                base.join(p)
            } else {
                p.to_path_buf()
            }
        };

        self.report_dir = rebase(self.report_dir.as_path());
        self.log_dir = rebase(self.log_dir.as_path());
        self.log_file = self.log_file.as_deref().map(rebase);
        self.template_path = self.template_path.as_deref().map(rebase);
        self
    }

    /// Template used for rendering: explicit path, else the one next to the reports
    pub fn template_candidate(&self) -> PathBuf {
        self.template_path
            .clone()
            .unwrap_or_else(|| self.report_dir.join("report.html"))
    }
}
