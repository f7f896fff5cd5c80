use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to scan log directory {}: {source}", .path.display())]
    LogDirUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read log file {}: {source}", .path.display())]
    UnreadableFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "Log format unrecognized: {failed} of {total} lines failed to parse \
         (ratio {ratio:.3} exceeds threshold {threshold:.3})"
    )]
    ErrorRateExceeded {
        failed: u64,
        total: u64,
        ratio: f64,
        threshold: f64,
    },

    #[error("Failed to read report template {}: {source}", .path.display())]
    TemplateUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write report {}: {source}", .path.display())]
    RenderWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode report rows: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to read config {}: {source}", .path.display())]
    ConfigUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, Error>;
