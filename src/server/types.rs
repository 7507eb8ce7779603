//! Request and response bodies

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::api::QueryResult;
use crate::models::{ApiError, Coordinates, Parameters};

/// POST /api/thematic-stats, /api/geoid
#[derive(Debug, Default, Deserialize)]
pub struct PointRequest {
    pub coordinates: Option<Coordinates>,
    #[serde(default)]
    pub parameters: Parameters,
}

/// POST /api/routing
#[derive(Debug, Default, Deserialize)]
pub struct RouteRequest {
    pub origin: Option<Coordinates>,
    pub destination: Option<Coordinates>,
    #[serde(default)]
    pub parameters: Parameters,
}

/// POST /api/benchmark
#[derive(Debug, Default, Deserialize)]
pub struct BenchmarkRequest {
    pub coordinates: Option<Coordinates>,
    /// Routing is only benchmarked when present
    pub destination: Option<Coordinates>,
    #[serde(default)]
    pub parameters: Parameters,
}

/// Parse a JSON body; an empty body reads as `{}`
pub fn parse_body<T: DeserializeOwned + Default>(body: &[u8]) -> Result<T, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| ApiError::validation(format!("Invalid request body: {e}")))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub message: &'static str,
}

/// Result plus the time the upstream call took
#[derive(Debug, Serialize)]
pub struct TimedResult {
    pub result: QueryResult,
    pub query_time_ms: f64,
}

/// Successful single-operation envelope
#[derive(Debug, Serialize)]
pub struct QueryResponse {
    #[serde(flatten)]
    pub timed: TimedResult,
    pub status: &'static str,
}

impl QueryResponse {
    pub fn success(result: QueryResult, query_time_ms: f64) -> Self {
        Self {
            timed: TimedResult {
                result,
                query_time_ms,
            },
            status: "success",
        }
    }
}

/// POST /api/benchmark response, keyed by operation name
#[derive(Debug, Serialize)]
pub struct BenchmarkResponse {
    pub results: BTreeMap<&'static str, TimedResult>,
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub status: &'static str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = Json(ErrorResponse {
            error: self.to_string(),
            status: "error",
        });
        (status, body).into_response()
    }
}
