use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Counts of lines seen and lines that failed to parse.
///
/// Per-line failures are only counted; the run as a whole is rejected once,
/// at the end of the stream, if the failure ratio is over the threshold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBudget {
    pub total_lines: u64,
    pub failed_lines: u64,
}

impl ErrorBudget {
    pub fn record_success(&mut self) {
        self.total_lines += 1;
    }

    pub fn record_failure(&mut self) {
        self.total_lines += 1;
        self.failed_lines += 1;
    }

    /// Fraction of failed lines; zero for an empty stream
    pub fn failure_ratio(&self) -> f64 {
        if self.total_lines == 0 {
            return 0.0;
        }
        self.failed_lines as f64 / self.total_lines as f64
    }

    /// Fail when the failure ratio strictly exceeds `threshold`
    pub fn check(&self, threshold: f64) -> Result<()> {
        let ratio = self.failure_ratio();

        if ratio > threshold {
            tracing::warn!(
                failed = self.failed_lines,
                total = self.total_lines,
                ratio,
                threshold,
                "Error rate gate tripped"
            );
            return Err(Error::ErrorRateExceeded {
                failed: self.failed_lines,
                total: self.total_lines,
                ratio,
                threshold,
            });
        }

        tracing::info!(
            failed = self.failed_lines,
            total = self.total_lines,
            ratio,
            threshold,
            "Error rate within budget"
        );
        Ok(())
    }
}
