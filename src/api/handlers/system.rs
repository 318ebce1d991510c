//! System endpoints: health check and stream statistics.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::app_state::AppState;
use crate::telemetry::TelemetrySnapshot;

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
struct HealthResponse {
    status: String,
    timestamp: String,
    version: String,
}

/// `GET /health` — Service health status.
#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    summary = "Health check",
    description = "Returns service health status, version, and current timestamp.",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    )
)]
pub async fn health_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            timestamp: Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}

/// Stream statistics response.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
struct StreamStatsResponse {
    connections: usize,
    subscriptions: usize,
    buffered_events: usize,
    counters: TelemetrySnapshot,
}

/// `GET /api/v1/stream/stats` — Streaming statistics.
#[utoipa::path(
    get,
    path = "/api/v1/stream/stats",
    tag = "System",
    summary = "Stream statistics",
    description = "Returns live connection, subscription, and buffer counts plus fire-and-forget telemetry counters.",
    responses(
        (status = 200, description = "Current streaming statistics", body = StreamStatsResponse),
    )
)]
pub async fn stats_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(StreamStatsResponse {
        connections: state.connections.len().await,
        subscriptions: state.stream.subscription_count().await,
        buffered_events: state.stream.buffered_events().await,
        counters: state.telemetry.snapshot(),
    })
}

/// Composes the root-level system routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health_handler))
}
