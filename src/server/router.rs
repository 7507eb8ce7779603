//! HTTP router and server loop

use anyhow::{Context, Result};
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tracing::info;

use super::handlers::{benchmark, geoid, health, routing, thematic_stats};
use crate::api::GeoClient;
use crate::benchmark::Benchmarker;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub client: Arc<GeoClient>,
    pub bench: Benchmarker,
}

impl AppState {
    pub fn new(client: GeoClient, bench: Benchmarker) -> Self {
        Self {
            client: Arc::new(client),
            bench,
        }
    }
}

/// Build the service router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/thematic-stats", post(thematic_stats))
        .route("/api/routing", post(routing))
        .route("/api/geoid", post(geoid))
        .route("/api/benchmark", post(benchmark))
        .with_state(state)
}

/// Serve until ctrl-c
pub async fn serve(addr: &str, state: AppState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!(
        "Listening on http://{}",
        listener.local_addr().context("Listener has no local address")?
    );

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await
        .context("HTTP server failed")
}
