//! Call log record models

use chrono::Local;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outcome of one benchmarked call
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Success { payload: Value },
    Failure { message: String },
}

/// Records written before failures were tracked only ever logged successes
impl Default for Outcome {
    fn default() -> Self {
        Outcome::Success {
            payload: Value::Null,
        }
    }
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }
}

/// One timed invocation of an upstream-calling operation.
///
/// Written once to the call log and never updated.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CallRecord {
    /// RFC 3339 time at which the call completed
    pub timestamp: String,

    /// Operation name
    #[serde(rename = "function", alias = "operation")]
    pub operation: String,

    /// Wall-clock duration in milliseconds
    #[serde(alias = "execution_time_ms")]
    pub duration_ms: f64,

    /// Serialized call arguments
    #[serde(default, alias = "args")]
    pub arguments: String,

    #[serde(default)]
    pub outcome: Outcome,
}

impl CallRecord {
    /// Create a record stamped with the current local time
    pub fn new(
        operation: impl Into<String>,
        arguments: impl Into<String>,
        duration_ms: f64,
        outcome: Outcome,
    ) -> Self {
        Self {
            timestamp: Local::now().to_rfc3339(),
            operation: operation.into(),
            duration_ms: duration_ms.max(0.0),
            arguments: arguments.into(),
            outcome,
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_wire_shape() {
        let record = CallRecord::new(
            "geoid",
            r#"{"lat":1.0}"#,
            12.5,
            Outcome::Success { payload: json!({"h": 1}) },
        );
        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(value["function"], "geoid");
        assert_eq!(value["duration_ms"], 12.5);
        assert_eq!(value["outcome"]["status"], "success");
        assert_eq!(value["outcome"]["payload"]["h"], 1);
        assert!(!value["timestamp"].as_str().unwrap().is_empty());
    }

    #[test]
    fn test_negative_duration_clamped() {
        let record = CallRecord::new("x", "", -3.0, Outcome::Failure { message: "e".into() });
        assert_eq!(record.duration_ms, 0.0);
        assert!(!record.is_success());
    }

    #[test]
    fn test_legacy_line() {
        let line = r#"{"timestamp": "2024-01-01T10:15:02.123456", "function": "get_route", "execution_time_ms": 123.45, "args": "((12.97, 77.59), (12.29, 76.63))", "kwargs": "{}"}"#;
        let record: CallRecord = serde_json::from_str(line).unwrap();
        assert_eq!(record.operation, "get_route");
        assert_eq!(record.duration_ms, 123.45);
        assert_eq!(record.arguments, "((12.97, 77.59), (12.29, 76.63))");
        assert!(record.is_success());
    }
}
