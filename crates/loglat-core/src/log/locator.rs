use crate::{Error, Result};
use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::fs;
use std::path::{Path, PathBuf};

lazy_static! {
    /// Remainder of a log filename after the prefix and `.gz` are stripped
    static ref DATE_STEM: Regex = Regex::new(r"^(\d{8})(?:[._-][0-9A-Za-z]+)?$").unwrap();
}

/// Compression formats we cannot decode; such files are never selected
const UNSUPPORTED_EXTENSIONS: &[&str] = &["bz2", "xz", "zst", "zip", "lz4", "Z"];

/// A log file picked for analysis
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogFileRef {
    pub path: PathBuf,
    pub date: NaiveDate,
    pub is_compressed: bool,
}

impl LogFileRef {
    fn file_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
    }

    /// Newer date first, then uncompressed, then lexically smaller name
    fn selection_key(&self) -> (NaiveDate, bool, Reverse<&str>) {
        (self.date, !self.is_compressed, Reverse(self.file_name()))
    }
}

/// Finds the most recent dated access log in a directory
#[derive(Debug, Clone)]
pub struct LogLocator {
    prefix: String,
}

impl LogLocator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Classify a filename, returning its date and compression flag on a match
    pub fn match_file_name(&self, name: &str) -> Option<(NaiveDate, bool)> {
        let (stem, is_compressed) = match name.strip_suffix(".gz") {
            Some(stem) => (stem, true),
            None => (name, false),
        };

        let rest = stem.strip_prefix(self.prefix.as_str())?;
        let caps = DATE_STEM.captures(rest)?;

        if let Some(ext) = rest.rsplit('.').next()
            && rest.contains('.')
            && UNSUPPORTED_EXTENSIONS.contains(&ext)
        {
            tracing::debug!("Skipping {}: unsupported compression", name);
            return None;
        }

        // Eight digits that are not a calendar date are simply not a match
        let date = NaiveDate::parse_from_str(&caps[1], "%Y%m%d").ok()?;
        Some((date, is_compressed))
    }

    /// Scan `dir` and return the newest matching log, if any
    pub fn locate(&self, dir: &Path) -> Result<Option<LogFileRef>> {
        tracing::debug!("Scanning log directory: {}", dir.display());

        let scan_err = |source| Error::LogDirUnreadable {
            path: dir.to_path_buf(),
            source,
        };

        let mut candidates = Vec::new();
        for entry in fs::read_dir(dir).map_err(scan_err)? {
            let entry = entry.map_err(scan_err)?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };

            if let Some((date, is_compressed)) = self.match_file_name(name) {
                candidates.push(LogFileRef {
                    path: path.clone(),
                    date,
                    is_compressed,
                });
            }
        }

        tracing::debug!("Found {} candidate log files", candidates.len());

        let selected = candidates
            .into_iter()
            .max_by(|a, b| a.selection_key().cmp(&b.selection_key()));

        if let Some(log) = &selected {
            tracing::info!(
                path = %log.path.display(),
                date = %log.date,
                compressed = log.is_compressed,
                "Selected log file"
            );
        }

        Ok(selected)
    }
}

impl Default for LogLocator {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_LOG_PREFIX)
    }
}
