//! Batch benchmark suite
//!
//! Runs every selected operation over the configured test locations and
//! routes through the `Benchmarker`, with bounded concurrency, and
//! summarizes success rates and durations per operation and overall.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use super::metrics::{DurationStats, ErrorStats};
use super::runner::Benchmarker;
use crate::api::{GeoClient, QueryResult};
use crate::config::SuiteConfig;
use crate::http::UpstreamError;
use crate::models::{Coordinates, Operation, Parameters};
use crate::utils::Timer;

/// Quality of one upstream answer
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseAnalysis {
    pub success: bool,
    pub has_data: bool,
    pub data_points: usize,
    pub error_message: Option<String>,
}

impl ResponseAnalysis {
    /// Analyze a successful payload.
    ///
    /// Top-level members of an object count their own length when they are
    /// arrays or objects, and one otherwise.
    pub fn from_payload(payload: &Value) -> Self {
        let data_points = match payload {
            Value::Object(map) => map.values().map(member_points).sum(),
            Value::Array(items) => items.len(),
            Value::Null => 0,
            _ => 1,
        };

        Self {
            success: true,
            has_data: data_points > 0,
            data_points,
            error_message: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            error_message: Some(message.into()),
            ..Default::default()
        }
    }
}

fn member_points(value: &Value) -> usize {
    match value {
        Value::Object(map) => map.len(),
        Value::Array(items) => items.len(),
        _ => 1,
    }
}

/// One executed case
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CaseResult {
    pub label: String,
    pub duration_ms: f64,
    pub analysis: ResponseAnalysis,
    /// Error class for failures (`timeout`, `status`, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
}

/// Results for one operation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ApiSummary {
    pub operation: Operation,
    pub total: usize,
    pub successes: usize,
    /// Percentage, 0-100
    pub success_rate: f64,
    pub durations: DurationStats,
    pub errors: ErrorStats,
    pub cases: Vec<CaseResult>,
}

impl ApiSummary {
    fn new(operation: Operation, cases: Vec<CaseResult>, errors: ErrorStats) -> Self {
        let total = cases.len();
        let successes = cases.iter().filter(|c| c.analysis.success).count();
        let samples: Vec<f64> = cases.iter().map(|c| c.duration_ms).collect();

        Self {
            operation,
            total,
            successes,
            success_rate: percent(successes, total),
            durations: DurationStats::from_samples(&samples),
            errors,
            cases,
        }
    }
}

/// Totals across every operation
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OverallStats {
    pub total_calls: usize,
    pub successes: usize,
    pub overall_success_rate: f64,
    /// Mean of the per-operation success rates
    pub avg_api_success_rate: f64,
    pub durations: DurationStats,
}

impl OverallStats {
    fn from_summaries(summaries: &[ApiSummary]) -> Self {
        let total_calls = summaries.iter().map(|s| s.total).sum();
        let successes = summaries.iter().map(|s| s.successes).sum();
        let samples: Vec<f64> = summaries
            .iter()
            .flat_map(|s| s.cases.iter().map(|c| c.duration_ms))
            .collect();
        let avg_api_success_rate = if summaries.is_empty() {
            0.0
        } else {
            summaries.iter().map(|s| s.success_rate).sum::<f64>() / summaries.len() as f64
        };

        Self {
            total_calls,
            successes,
            overall_success_rate: percent(successes, total_calls),
            avg_api_success_rate,
            durations: DurationStats::from_samples(&samples),
        }
    }
}

/// Output of a suite run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SuiteReport {
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub total_time_ms: f64,
    pub apis: Vec<ApiSummary>,
    pub overall: OverallStats,
}

impl SuiteReport {
    #[cfg(test)]
    pub fn summary(&self, operation: Operation) -> Option<&ApiSummary> {
        self.apis.iter().find(|s| s.operation == operation)
    }
}

#[derive(Clone, Copy, Debug)]
enum Target {
    Point(Coordinates),
    Route(Coordinates, Coordinates),
}

#[derive(Clone, Debug)]
struct SuiteCase {
    operation: Operation,
    label: String,
    target: Target,
}

/// Suite driver
pub struct SuiteRunner {
    client: Arc<GeoClient>,
    bench: Benchmarker,
    config: SuiteConfig,
    max_concurrent: usize,
}

impl SuiteRunner {
    pub fn new(client: Arc<GeoClient>, bench: Benchmarker, config: SuiteConfig) -> Self {
        Self {
            client,
            bench,
            config,
            max_concurrent: 4,
        }
    }

    pub fn with_concurrency(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    fn cases(&self, operation: Operation) -> Vec<SuiteCase> {
        match operation {
            Operation::Routing => self
                .config
                .routes
                .iter()
                .map(|r| SuiteCase {
                    operation,
                    label: r.name.clone(),
                    target: Target::Route(r.origin, r.destination),
                })
                .collect(),
            _ => self
                .config
                .locations
                .iter()
                .map(|l| SuiteCase {
                    operation,
                    label: l.name.clone(),
                    target: Target::Point(l.coordinates),
                })
                .collect(),
        }
    }

    /// Run the selected operations, all of them when `operations` is empty
    pub async fn run(&self, operations: &[Operation]) -> SuiteReport {
        let operations: Vec<Operation> = if operations.is_empty() {
            Operation::all().to_vec()
        } else {
            operations.to_vec()
        };

        info!(
            "Running suite over {} operations (max {} concurrent)",
            operations.len(),
            self.max_concurrent
        );

        let started_at = Utc::now();
        let timer = Timer::start("suite");
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));

        let mut apis = Vec::new();
        for operation in operations {
            let summary = self.run_operation(operation, &semaphore).await;
            info!(
                "{}: {}/{} succeeded ({:.1}%), mean {:.2}ms",
                operation.title(),
                summary.successes,
                summary.total,
                summary.success_rate,
                summary.durations.mean_ms
            );
            apis.push(summary);
        }

        let overall = OverallStats::from_summaries(&apis);
        SuiteReport {
            started_at,
            completed_at: Utc::now(),
            total_time_ms: timer.stop(),
            apis,
            overall,
        }
    }

    async fn run_operation(&self, operation: Operation, semaphore: &Arc<Semaphore>) -> ApiSummary {
        let mut handles = Vec::new();

        for case in self.cases(operation) {
            let semaphore = semaphore.clone();
            let client = self.client.clone();
            let bench = self.bench.clone();
            let parameters = self.config.parameters.clone();

            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire().await.ok();
                debug!("Testing {} at {}", case.operation, case.label);
                run_case(&client, &bench, &case, &parameters).await
            }));
        }

        let mut cases = Vec::new();
        let mut errors = ErrorStats::default();
        for joined in join_all(handles).await {
            match joined {
                Ok((result, error)) => {
                    if let Some(error) = &error {
                        errors.record(error);
                    }
                    cases.push(result);
                }
                Err(e) => warn!("{} case aborted: {}", operation, e),
            }
        }

        ApiSummary::new(operation, cases, errors)
    }
}

async fn run_case(
    client: &GeoClient,
    bench: &Benchmarker,
    case: &SuiteCase,
    parameters: &Parameters,
) -> (CaseResult, Option<UpstreamError>) {
    let timed = match case.target {
        Target::Point(coordinates) => {
            let arguments = json!({ "coordinates": coordinates, "parameters": parameters });
            let call = client.point_query(case.operation, coordinates, parameters);
            bench.call_timed(case.operation.name(), &arguments, call).await
        }
        Target::Route(origin, destination) => {
            let arguments = json!({
                "origin": origin,
                "destination": destination,
                "parameters": parameters,
            });
            let call = client.route(origin, destination, parameters);
            bench.call_timed(case.operation.name(), &arguments, call).await
        }
    };

    let (analysis, error) = match timed.value {
        Ok(QueryResult { payload, .. }) => (ResponseAnalysis::from_payload(payload.value()), None),
        Err(e) => (ResponseAnalysis::failure(e.to_string()), Some(e)),
    };

    let result = CaseResult {
        label: case.label.clone(),
        duration_ms: timed.duration_ms,
        analysis,
        error_kind: error.as_ref().map(|e| e.kind().to_string()),
    };
    (result, error)
}

fn percent(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::benchmark::recorder::CallLog;
    use crate::config::{NamedLocation, NamedRoute, ServicesConfig};
    use crate::http::HttpClient;
    use crate::testutil::spawn_stub_upstream;

    fn runner(base_url: &str, log: &std::path::Path) -> SuiteRunner {
        let client = GeoClient::new(
            HttpClient::new().unwrap(),
            ServicesConfig::all_at(base_url),
            "token",
        );
        let bench = Benchmarker::new(Arc::new(CallLog::new(log)));
        SuiteRunner::new(Arc::new(client), bench, SuiteConfig::default())
    }

    #[test]
    fn test_response_analysis_counts_members() {
        let analysis = ResponseAnalysis::from_payload(&json!({
            "districts": [1, 2, 3],
            "meta": {"a": 1, "b": 2},
            "name": "x",
        }));
        assert!(analysis.success);
        assert!(analysis.has_data);
        assert_eq!(analysis.data_points, 6);

        let empty = ResponseAnalysis::from_payload(&json!({}));
        assert!(empty.success);
        assert!(!empty.has_data);

        assert_eq!(ResponseAnalysis::from_payload(&json!([1, 2])).data_points, 2);
    }

    #[test]
    fn test_response_analysis_failure() {
        let analysis = ResponseAnalysis::failure("boom");
        assert!(!analysis.success);
        assert_eq!(analysis.data_points, 0);
        assert_eq!(analysis.error_message.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn test_suite_against_stub() {
        let stub = spawn_stub_upstream().await;
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("calls.jsonl");

        let report = runner(&stub.base_url(), &log)
            .with_concurrency(2)
            .run(&[])
            .await;

        let defaults = SuiteConfig::default();
        let expected_calls = defaults.locations.len() * 2 + defaults.routes.len();

        assert_eq!(report.apis.len(), 3);
        assert_eq!(report.overall.total_calls, expected_calls);
        assert_eq!(report.overall.successes, expected_calls);
        assert_eq!(report.overall.overall_success_rate, 100.0);
        assert_eq!(stub.hits(), expected_calls);

        let routing = report.summary(Operation::Routing).unwrap();
        assert_eq!(routing.total, defaults.routes.len());
        // {"query": {origin_lat, origin_lng, dest_lat, dest_lng}}
        assert_eq!(routing.cases[0].analysis.data_points, 4);

        let records = CallLog::new(&log).read_all().unwrap();
        assert_eq!(records.len(), expected_calls);
    }

    #[tokio::test]
    async fn test_suite_records_failures() {
        let stub = spawn_stub_upstream().await;
        let dir = tempfile::tempdir().unwrap();
        let base = format!("{}/broken", stub.base_url());

        let mut suite = runner(&base, &dir.path().join("calls.jsonl"));
        suite.config = SuiteConfig {
            locations: vec![NamedLocation {
                name: "Bangalore".into(),
                coordinates: Coordinates::new(12.9716, 77.5946),
            }],
            routes: vec![NamedRoute {
                name: "Short hop".into(),
                origin: Coordinates::new(12.9716, 77.5946),
                destination: Coordinates::new(12.2958, 76.6394),
            }],
            parameters: Parameters::new(),
        };

        let report = suite.run(&[Operation::Geoid]).await;
        let geoid = report.summary(Operation::Geoid).unwrap();

        assert_eq!(geoid.total, 1);
        assert_eq!(geoid.successes, 0);
        assert_eq!(geoid.success_rate, 0.0);
        assert_eq!(geoid.errors.server_errors, 1);
        assert_eq!(geoid.cases[0].error_kind.as_deref(), Some("status"));
        assert!(geoid.cases[0]
            .analysis
            .error_message
            .as_deref()
            .unwrap()
            .contains("503"));
        assert!(report.summary(Operation::Routing).is_none());
    }

    #[test]
    fn test_overall_stats_empty() {
        let overall = OverallStats::from_summaries(&[]);
        assert_eq!(overall.total_calls, 0);
        assert_eq!(overall.overall_success_rate, 0.0);
    }
}
