// src/routes/health.rs
//! Liveness endpoint for the proxy.
//!
//! Load balancers and container orchestrators poll `/health` to check that
//! the process is up and serving HTTP. It never touches Timestream, so a
//! store outage does not take the proxy out of rotation; ingest keeps
//! answering `200` in that case anyway.

use axum::{routing::get, Json, Router};
use serde::Serialize;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

/// Handle `GET /health`.
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Subrouter with the `/health` route, generic over the gateway state so it
/// merges regardless of which store backs the ingest route.
pub fn router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().route("/health", get(health))
}
