//! Benchmarked call execution
//!
//! Times an operation, appends one `CallRecord` for it and hands the
//! original result back. Logging is best-effort and never changes the
//! outcome the caller sees.

use serde::Serialize;
use serde_json::Value;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

use super::recorder::CallLog;
use crate::models::{CallRecord, Outcome};
use crate::utils::{time_async, Timed};

/// Runs operations through the timer and the call log
#[derive(Clone, Debug)]
pub struct Benchmarker {
    log: Arc<CallLog>,
}

impl Benchmarker {
    pub fn new(log: Arc<CallLog>) -> Self {
        Self { log }
    }

    #[cfg(test)]
    pub fn log(&self) -> &CallLog {
        &self.log
    }

    /// Time and log an async operation; returns the value and its duration.
    ///
    /// Errors are logged with their elapsed time, then returned unchanged.
    pub async fn call<A, F, T, E>(
        &self,
        operation: &str,
        arguments: &A,
        future: F,
    ) -> Result<(T, f64), E>
    where
        A: Serialize + ?Sized,
        F: Future<Output = Result<T, E>>,
        T: Serialize,
        E: Display,
    {
        let timed = self.call_timed(operation, arguments, future).await;
        timed.value.map(|value| (value, timed.duration_ms))
    }

    /// Like `call`, but keeps the duration for failures too
    pub async fn call_timed<A, F, T, E>(
        &self,
        operation: &str,
        arguments: &A,
        future: F,
    ) -> Timed<Result<T, E>>
    where
        A: Serialize + ?Sized,
        F: Future<Output = Result<T, E>>,
        T: Serialize,
        E: Display,
    {
        let timed = time_async(future).await;
        self.record(operation, arguments, &timed).await;
        timed
    }

    async fn record<A, T, E>(&self, operation: &str, arguments: &A, timed: &Timed<Result<T, E>>)
    where
        A: Serialize + ?Sized,
        T: Serialize,
        E: Display,
    {
        let outcome = match &timed.value {
            Ok(value) => Outcome::Success {
                payload: serde_json::to_value(value).unwrap_or(Value::Null),
            },
            Err(e) => {
                warn!("{} failed after {}ms: {}", operation, timed.duration_ms, e);
                Outcome::Failure {
                    message: e.to_string(),
                }
            }
        };

        let arguments = serde_json::to_string(arguments)
            .unwrap_or_else(|e| format!("<unserializable arguments: {e}>"));

        debug!("{} took {}ms", operation, timed.duration_ms);
        let record = CallRecord::new(operation, arguments, timed.duration_ms, outcome);

        // File append blocks; keep it off the async workers
        let log = self.log.clone();
        if let Err(e) = tokio::task::spawn_blocking(move || log.record(&record)).await {
            warn!("Call log task for {} failed: {}", operation, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Outcome;
    use serde_json::json;
    use std::time::Duration;

    fn benchmarker() -> (tempfile::TempDir, Benchmarker) {
        let dir = tempfile::tempdir().unwrap();
        let log = Arc::new(CallLog::new(dir.path().join("api_benchmark.jsonl")));
        (dir, Benchmarker::new(log))
    }

    #[tokio::test]
    async fn test_call_times_and_logs() {
        let (_dir, bench) = benchmarker();

        let (value, ms) = bench
            .call("dummy_function", &("test", "value"), async {
                tokio::time::sleep(Duration::from_millis(100)).await;
                Ok::<_, String>(json!({"param1": "test", "param2": "value"}))
            })
            .await
            .unwrap();

        assert_eq!(value["param1"], "test");
        assert!(ms >= 100.0);

        let records = bench.log().read_all().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].operation, "dummy_function");
        assert_eq!(records[0].arguments, r#"["test","value"]"#);
        assert_eq!(records[0].duration_ms, ms);
        assert!(records[0].is_success());
    }

    #[tokio::test]
    async fn test_call_propagates_original_error() {
        let (_dir, bench) = benchmarker();

        let err = bench
            .call("failing", &json!({}), async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                Err::<Value, _>("upstream exploded".to_string())
            })
            .await
            .unwrap_err();

        assert_eq!(err, "upstream exploded");

        let records = bench.log().read_all().unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].duration_ms >= 10.0);
        assert_eq!(
            records[0].outcome,
            Outcome::Failure { message: "upstream exploded".into() }
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_calls_each_logged_once() {
        let (_dir, bench) = benchmarker();

        let calls = (0..20).map(|i| {
            let bench = bench.clone();
            tokio::spawn(async move {
                bench
                    .call("geoid", &[i], async move { Ok::<_, String>(i) })
                    .await
            })
        });
        for joined in futures::future::join_all(calls).await {
            joined.unwrap().unwrap();
        }

        let mut arguments: Vec<String> = bench
            .log()
            .read_all()
            .unwrap()
            .into_iter()
            .map(|r| r.arguments)
            .collect();
        arguments.sort();
        arguments.dedup();
        assert_eq!(arguments.len(), 20);
    }

    #[tokio::test]
    async fn test_logging_failure_does_not_affect_call() {
        let dir = tempfile::tempdir().unwrap();
        let bench = Benchmarker::new(Arc::new(CallLog::new(dir.path())));

        let (value, _) = bench
            .call("op", &(), async { Ok::<_, String>(42) })
            .await
            .unwrap();

        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn test_identical_calls_produce_independent_records() {
        let (_dir, bench) = benchmarker();

        for _ in 0..2 {
            bench
                .call("geoid", &json!({"lat": 1.0}), async {
                    Ok::<_, String>(json!({"h": 42.1}))
                })
                .await
                .unwrap();
        }

        let records = bench.log().read_all().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].outcome, records[1].outcome);
        assert!(!records[0].timestamp.is_empty());
        assert!(!records[1].timestamp.is_empty());
    }
}
