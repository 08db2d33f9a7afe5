// ABOUTME: Keep-alive HTTP server for hosts that idle processes without inbound traffic
// ABOUTME: Serves a liveness page, a JSON health report and Prometheus metrics

use anyhow::{Context, Result};
use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;

use crate::config::KeepAliveConfig;
use crate::SharedRouter;

#[derive(Clone)]
pub struct KeepAliveState {
    started: Instant,
    started_at: chrono::DateTime<chrono::Utc>,
    router: SharedRouter,
    metrics: Option<PrometheusHandle>,
}

impl KeepAliveState {
    pub fn new(router: SharedRouter, metrics: Option<PrometheusHandle>) -> Self {
        Self {
            started: Instant::now(),
            started_at: chrono::Utc::now(),
            router,
            metrics,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub connected: bool,
    pub started_at: String,
    pub uptime_secs: u64,
    pub outstanding_requests: usize,
}

pub fn keepalive_router(state: KeepAliveState) -> Router {
    Router::new()
        .route("/", get(|| async { "alive" }))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

/// Bind and serve until the process exits
pub async fn start_keepalive_server(
    config: &KeepAliveConfig,
    state: KeepAliveState,
) -> Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!(addr = %addr, "Starting keep-alive server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind keep-alive server to {}", addr))?;
    axum::serve(listener, keepalive_router(state))
        .await
        .context("Keep-alive server failed")?;
    Ok(())
}

async fn health_handler(State(state): State<Arc<KeepAliveState>>) -> Json<HealthResponse> {
    let router = state.router.get();
    Json(HealthResponse {
        status: "ok",
        connected: router.is_some(),
        started_at: state.started_at.to_rfc3339(),
        uptime_secs: state.started.elapsed().as_secs(),
        outstanding_requests: router.map(|r| r.requests().len()).unwrap_or(0),
    })
}

/// Handle GET /metrics - returns Prometheus text format
async fn metrics_handler(State(state): State<Arc<KeepAliveState>>) -> impl IntoResponse {
    state
        .metrics
        .as_ref()
        .map(|handle| handle.render())
        .unwrap_or_default()
}
