//! Duration statistics and per-operation aggregation
//!
//! Provides summary statistics over call durations and groups call log
//! records by operation name.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::http::UpstreamError;
use crate::models::CallRecord;

/// Calculate percentile value from sorted array.
///
/// Linear interpolation between closest ranks, so the 50th percentile of an
/// even-sized sample is the mean of the two middle values.
fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    if sorted.len() == 1 {
        return sorted[0];
    }

    let idx = (p / 100.0) * (sorted.len() - 1) as f64;
    let lower = idx.floor() as usize;
    let upper = idx.ceil() as usize;
    let fraction = idx - lower as f64;

    if upper >= sorted.len() {
        sorted[sorted.len() - 1]
    } else {
        sorted[lower] * (1.0 - fraction) + sorted[upper] * fraction
    }
}

/// Duration statistics in milliseconds
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DurationStats {
    pub count: usize,
    pub mean_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
    pub median_ms: f64,
    pub p95_ms: f64,
    pub std_dev_ms: f64,
}

impl DurationStats {
    /// Calculate statistics from duration samples
    pub fn from_samples(samples: &[f64]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }

        let mut sorted = samples.to_vec();
        sorted.sort_by(f64::total_cmp);

        let count = sorted.len();
        let mean = sorted.iter().sum::<f64>() / count as f64;
        let variance = sorted.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / count as f64;

        Self {
            count,
            mean_ms: mean,
            min_ms: sorted[0],
            max_ms: sorted[count - 1],
            median_ms: percentile(&sorted, 50.0),
            p95_ms: percentile(&sorted, 95.0),
            std_dev_ms: variance.sqrt(),
        }
    }
}

/// Statistics for one operation, derived from the call log
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AggregateStats {
    pub operation: String,
    /// Calls that ended in failure
    pub failures: usize,
    #[serde(flatten)]
    pub durations: DurationStats,
}

impl AggregateStats {
    pub fn count(&self) -> usize {
        self.durations.count
    }

    pub fn success_rate(&self) -> f64 {
        if self.count() == 0 {
            0.0
        } else {
            (self.count() - self.failures) as f64 / self.count() as f64
        }
    }
}

/// Group records by operation name and summarize each group.
///
/// Groups are returned in operation-name order.
pub fn aggregate(records: &[CallRecord]) -> Vec<AggregateStats> {
    let mut groups: BTreeMap<&str, (Vec<f64>, usize)> = BTreeMap::new();

    for record in records {
        let (durations, failures) = groups.entry(record.operation.as_str()).or_default();
        durations.push(record.duration_ms);
        if !record.is_success() {
            *failures += 1;
        }
    }

    groups
        .into_iter()
        .map(|(operation, (durations, failures))| AggregateStats {
            operation: operation.to_string(),
            failures,
            durations: DurationStats::from_samples(&durations),
        })
        .collect()
}

/// Failure counts by class
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorStats {
    /// Connection errors
    pub connection_errors: u64,
    /// Timeout errors
    pub timeout_errors: u64,
    /// HTTP 4xx errors
    pub client_errors: u64,
    /// HTTP 5xx errors
    pub server_errors: u64,
    /// Undecodable bodies and everything else
    pub other_errors: u64,
}

impl ErrorStats {
    /// Total error count
    pub fn total(&self) -> u64 {
        self.connection_errors
            + self.timeout_errors
            + self.client_errors
            + self.server_errors
            + self.other_errors
    }

    /// Record one upstream error
    pub fn record(&mut self, error: &UpstreamError) {
        match (error, error.status()) {
            (UpstreamError::Timeout { .. }, _) => self.timeout_errors += 1,
            (UpstreamError::Connect(_), _) => self.connection_errors += 1,
            (UpstreamError::Status { .. }, Some(400..=499)) => self.client_errors += 1,
            (UpstreamError::Status { .. }, Some(500..=599)) => self.server_errors += 1,
            _ => self.other_errors += 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Outcome;
    use serde_json::json;

    fn record(name: &str, ms: f64, ok: bool) -> CallRecord {
        let outcome = if ok {
            Outcome::Success { payload: json!(null) }
        } else {
            Outcome::Failure { message: "x".into() }
        };
        CallRecord::new(name, "", ms, outcome)
    }

    #[test]
    fn test_percentile_interpolates() {
        let data: Vec<f64> = (1..=100).map(|x| x as f64).collect();
        assert!((percentile(&data, 50.0) - 50.5).abs() < 1e-9);
        assert!((percentile(&data, 95.0) - 95.05).abs() < 1e-9);
    }

    #[test]
    fn test_median_even_and_odd() {
        assert_eq!(DurationStats::from_samples(&[30.0, 10.0, 20.0]).median_ms, 20.0);
        assert_eq!(DurationStats::from_samples(&[4.0, 1.0, 3.0, 2.0]).median_ms, 2.5);
        assert_eq!(DurationStats::from_samples(&[]).median_ms, 0.0);
    }

    #[test]
    fn test_duration_stats() {
        let stats = DurationStats::from_samples(&[10.0, 20.0, 30.0]);
        assert_eq!(stats.count, 3);
        assert_eq!(stats.mean_ms, 20.0);
        assert_eq!(stats.min_ms, 10.0);
        assert_eq!(stats.max_ms, 30.0);
        assert_eq!(stats.median_ms, 20.0);
    }

    #[test]
    fn test_aggregate_groups_by_operation() {
        let records = vec![
            record("X", 10.0, true),
            record("Y", 5.0, false),
            record("X", 30.0, true),
            record("X", 20.0, false),
        ];

        let stats = aggregate(&records);
        assert_eq!(stats.len(), 2);

        let x = &stats[0];
        assert_eq!(x.operation, "X");
        assert_eq!(x.count(), 3);
        assert_eq!(x.durations.mean_ms, 20.0);
        assert_eq!(x.durations.min_ms, 10.0);
        assert_eq!(x.durations.max_ms, 30.0);
        assert_eq!(x.durations.median_ms, 20.0);
        assert_eq!(x.failures, 1);

        let y = &stats[1];
        assert_eq!(y.operation, "Y");
        assert_eq!(y.count(), 1);
        assert_eq!(y.success_rate(), 0.0);
    }

    #[test]
    fn test_aggregate_empty() {
        assert!(aggregate(&[]).is_empty());
    }

    #[test]
    fn test_error_stats() {
        let mut errors = ErrorStats::default();
        errors.record(&UpstreamError::Status { status: 404, body: String::new() });
        errors.record(&UpstreamError::Status { status: 500, body: String::new() });
        errors.record(&UpstreamError::Timeout { url: String::new(), timeout_ms: 1 });
        errors.record(&UpstreamError::Connect(String::new()));
        errors.record(&UpstreamError::NotConfigured("geoid".into()));

        assert_eq!(errors.client_errors, 1);
        assert_eq!(errors.server_errors, 1);
        assert_eq!(errors.timeout_errors, 1);
        assert_eq!(errors.connection_errors, 1);
        assert_eq!(errors.other_errors, 1);
        assert_eq!(errors.total(), 5);
    }
}
