use super::{AggregateReport, ErrorBudget, UrlStats};
use crate::log::{ParseOutcome, ParsedRecord};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Raw per-URL accumulation; durations are kept for an exact median
#[derive(Debug, Default)]
struct UrlAccumulator {
    count: u64,
    time_sum: f64,
    time_max: f64,
    durations: Vec<f64>,
}

impl UrlAccumulator {
    fn push(&mut self, duration: f64) {
        self.count += 1;
        self.time_sum += duration;
        if duration > self.time_max {
            self.time_max = duration;
        }
        self.durations.push(duration);
    }
}

/// Two-phase aggregation: `record` every outcome, then `finalize` once.
#[derive(Debug, Default)]
pub struct Aggregator {
    urls: HashMap<String, UrlAccumulator>,
    budget: ErrorBudget,
    total_requests: u64,
    total_time: f64,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, outcome: ParseOutcome) {
        match outcome {
            ParseOutcome::Record(record) => self.record_parsed(record),
            ParseOutcome::Failure(failure) => {
                tracing::debug!(reason = %failure.reason, line = %failure.line, "Unparsable line");
                self.budget.record_failure();
            }
        }
    }

    pub fn record_parsed(&mut self, record: ParsedRecord) {
        self.budget.record_success();
        self.total_requests += 1;
        self.total_time += record.duration;
        self.urls.entry(record.url).or_default().push(record.duration);
    }

    pub fn budget(&self) -> ErrorBudget {
        self.budget
    }

    /// Compute averages, medians and shares, rank by total time and keep `top_n` rows
    pub fn finalize(self, top_n: usize) -> AggregateReport {
        tracing::debug!("Finalizing statistics for {} URLs", self.urls.len());

        let total_urls = self.urls.len();
        let total_requests = self.total_requests;
        let total_time = self.total_time;

        let mut rows: Vec<UrlStats> = self
            .urls
            .into_iter()
            .map(|(url, acc)| {
                let count = acc.count as f64;
                UrlStats {
                    count_perc: percent(count, total_requests as f64),
                    time_perc: percent(acc.time_sum, total_time),
                    // Summing equal values can round above the max
                    time_avg: (acc.time_sum / count).min(acc.time_max),
                    time_med: median(acc.durations),
                    time_max: acc.time_max,
                    time_sum: acc.time_sum,
                    count: acc.count,
                    url,
                }
            })
            .collect();

        rows.sort_by(rank);
        rows.truncate(top_n);

        tracing::info!(
            urls = total_urls,
            requests = total_requests,
            total_time,
            kept = rows.len(),
            "Aggregation complete"
        );

        AggregateReport {
            rows,
            budget: self.budget,
            total_urls,
            total_requests,
            total_time,
        }
    }
}

/// `time_sum` descending, then URL ascending
fn rank(a: &UrlStats, b: &UrlStats) -> Ordering {
    b.time_sum
        .total_cmp(&a.time_sum)
        .then_with(|| a.url.cmp(&b.url))
}

fn percent(part: f64, whole: f64) -> f64 {
    if whole > 0.0 { 100.0 * part / whole } else { 0.0 }
}

/// Exact median; even-sized inputs average the two middle values
fn median(mut values: Vec<f64>) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len().is_multiple_of(2) {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}
