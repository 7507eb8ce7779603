//! Route handlers
//!
//! Every upstream call goes through the shared `Benchmarker`, so served
//! requests land in the call log like any other call.

use axum::{body::Bytes, extract::State, response::Json};
use serde_json::json;
use std::collections::BTreeMap;
use tracing::{debug, error, info, warn};

use super::router::AppState;
use super::types::{
    parse_body, BenchmarkRequest, BenchmarkResponse, HealthResponse, PointRequest, QueryResponse,
    RouteRequest, TimedResult,
};
use crate::api::QueryResult;
use crate::models::{ApiError, Coordinates, Operation, Parameters};

const COORDINATES_REQUIRED: &str = "Coordinates are required";
const ROUTE_REQUIRED: &str = "Origin and destination coordinates are required";

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        message: "API is running",
    })
}

/// POST /api/thematic-stats
pub async fn thematic_stats(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<QueryResponse>, ApiError> {
    let request: PointRequest = parse_body(&body).map_err(rejected)?;
    let coordinates = request
        .coordinates
        .ok_or_else(|| rejected(ApiError::validation(COORDINATES_REQUIRED)))?;

    let (result, ms) = point_query(&state, Operation::ThematicStatistics, coordinates, &request.parameters)
        .await
        .map_err(failed)?;
    Ok(Json(QueryResponse::success(result, ms)))
}

/// POST /api/geoid
pub async fn geoid(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<QueryResponse>, ApiError> {
    let request: PointRequest = parse_body(&body).map_err(rejected)?;
    let coordinates = request
        .coordinates
        .ok_or_else(|| rejected(ApiError::validation(COORDINATES_REQUIRED)))?;

    let (result, ms) = point_query(&state, Operation::Geoid, coordinates, &request.parameters)
        .await
        .map_err(failed)?;
    Ok(Json(QueryResponse::success(result, ms)))
}

/// POST /api/routing
pub async fn routing(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<QueryResponse>, ApiError> {
    let request: RouteRequest = parse_body(&body).map_err(rejected)?;
    let (Some(origin), Some(destination)) = (request.origin, request.destination) else {
        return Err(rejected(ApiError::validation(ROUTE_REQUIRED)));
    };

    let (result, ms) = route_query(&state, origin, destination, &request.parameters)
        .await
        .map_err(failed)?;
    Ok(Json(QueryResponse::success(result, ms)))
}

/// POST /api/benchmark
pub async fn benchmark(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<BenchmarkResponse>, ApiError> {
    let request: BenchmarkRequest = parse_body(&body).map_err(rejected)?;
    let coordinates = request
        .coordinates
        .ok_or_else(|| rejected(ApiError::validation(COORDINATES_REQUIRED)))?;
    let parameters = &request.parameters;

    let mut results = BTreeMap::new();

    for operation in [Operation::ThematicStatistics, Operation::Geoid] {
        let (result, query_time_ms) = point_query(&state, operation, coordinates, parameters)
            .await
            .map_err(failed)?;
        results.insert(operation.name(), TimedResult { result, query_time_ms });
    }

    if let Some(destination) = request.destination {
        let (result, query_time_ms) = route_query(&state, coordinates, destination, parameters)
            .await
            .map_err(failed)?;
        results.insert(Operation::Routing.name(), TimedResult { result, query_time_ms });
    }

    info!("Benchmarked {} operations at {}", results.len(), coordinates);
    Ok(Json(BenchmarkResponse {
        results,
        status: "success",
    }))
}

async fn point_query(
    state: &AppState,
    operation: Operation,
    coordinates: Coordinates,
    parameters: &Parameters,
) -> Result<(QueryResult, f64), ApiError> {
    let arguments = json!({ "coordinates": coordinates, "parameters": parameters });
    let call = state.client.point_query(operation, coordinates, parameters);

    Ok(state.bench.call(operation.name(), &arguments, call).await?)
}

async fn route_query(
    state: &AppState,
    origin: Coordinates,
    destination: Coordinates,
    parameters: &Parameters,
) -> Result<(QueryResult, f64), ApiError> {
    let arguments = json!({
        "origin": origin,
        "destination": destination,
        "parameters": parameters,
    });
    let call = state.client.route(origin, destination, parameters);

    Ok(state
        .bench
        .call(Operation::Routing.name(), &arguments, call)
        .await?)
}

fn rejected(e: ApiError) -> ApiError {
    warn!("Rejected request: {}", e);
    e
}

fn failed(e: ApiError) -> ApiError {
    error!("Upstream call failed (kind={}): {}", e.kind(), e);
    if let Some(body) = e.upstream_body() {
        debug!("Upstream body: {}", body);
    }
    e
}
