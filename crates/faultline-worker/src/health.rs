//! Worker endpoints for the orchestrator and the scraper.
//!
//! `/health` only says the process is up; a failing export does not make the
//! worker unhealthy, it shows up in `faultline_runs_total{outcome="failed"}`.
//! `/ready` turns 503 once shutdown starts so no new tick is expected.

use axum::{extract::State, http::StatusCode, routing::get, Router};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::metrics::WorkerMetrics;

pub struct EndpointState {
    pub metrics: WorkerMetrics,
    /// Set while the schedule loop accepts ticks.
    pub accepting_ticks: Arc<AtomicBool>,
}

pub fn endpoint_router(state: Arc<EndpointState>) -> Router {
    Router::new()
        .route("/health", get(liveness))
        .route("/ready", get(readiness))
        .route("/metrics", get(export_metrics))
        .with_state(state)
}

async fn liveness() -> &'static str {
    "OK"
}

async fn readiness(State(state): State<Arc<EndpointState>>) -> Result<&'static str, StatusCode> {
    if state.accepting_ticks.load(Ordering::Relaxed) {
        Ok("OK")
    } else {
        Err(StatusCode::SERVICE_UNAVAILABLE)
    }
}

async fn export_metrics(State(state): State<Arc<EndpointState>>) -> String {
    state.metrics.encode()
}
