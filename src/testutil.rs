//! Test helpers: ephemeral axum servers and a stub upstream provider

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Serve a router on an ephemeral local port
pub async fn spawn(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// A local address with nothing listening on it
pub fn unused_addr() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap()
}

/// Stub upstream echoing its query parameters.
///
/// `/statistics`, `/route` and `/data` answer 200 with `{"query": {...}}`;
/// the same paths under `/broken` answer 503, under `/slow` they answer
/// after 300ms, and under `/empty` they answer `[]`.
pub struct StubUpstream {
    pub addr: SocketAddr,
    hits: Arc<AtomicUsize>,
}

impl StubUpstream {
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

async fn echo(
    State(hits): State<Arc<AtomicUsize>>,
    Query(query): Query<BTreeMap<String, String>>,
) -> impl IntoResponse {
    hits.fetch_add(1, Ordering::SeqCst);
    Json(json!({ "query": query }))
}

async fn broken(State(hits): State<Arc<AtomicUsize>>) -> impl IntoResponse {
    hits.fetch_add(1, Ordering::SeqCst);
    (StatusCode::SERVICE_UNAVAILABLE, "under maintenance")
}

async fn slow(
    state: State<Arc<AtomicUsize>>,
    query: Query<BTreeMap<String, String>>,
) -> impl IntoResponse {
    tokio::time::sleep(Duration::from_millis(300)).await;
    echo(state, query).await
}

async fn empty(State(hits): State<Arc<AtomicUsize>>) -> impl IntoResponse {
    hits.fetch_add(1, Ordering::SeqCst);
    Json(json!([]))
}

pub async fn spawn_stub_upstream() -> StubUpstream {
    let hits = Arc::new(AtomicUsize::new(0));
    let mut app = Router::new();

    for path in ["/statistics", "/route", "/data"] {
        app = app
            .route(path, get(echo))
            .route(&format!("/broken{path}"), get(broken))
            .route(&format!("/slow{path}"), get(slow))
            .route(&format!("/empty{path}"), get(empty));
    }

    let addr = spawn(app.with_state(hits.clone())).await;
    StubUpstream { addr, hits }
}
