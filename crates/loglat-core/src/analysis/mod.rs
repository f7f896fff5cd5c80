mod aggregator;
mod budget;

pub use aggregator::Aggregator;
pub use budget::ErrorBudget;

use serde::{Deserialize, Serialize};

/// Finalized statistics for one URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrlStats {
    pub url: String,
    pub count: u64,
    /// Share of all parsed requests, in percent
    pub count_perc: f64,
    pub time_sum: f64,
    /// Share of the total serving time, in percent
    pub time_perc: f64,
    pub time_avg: f64,
    pub time_max: f64,
    pub time_med: f64,
}

/// Ranked URL statistics for one log, ready for rendering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateReport {
    /// Sorted by `time_sum` descending, URL ascending on ties, at most top-N
    pub rows: Vec<UrlStats>,
    pub budget: ErrorBudget,
    /// Distinct URLs seen, before truncation
    pub total_urls: usize,
    pub total_requests: u64,
    pub total_time: f64,
}
