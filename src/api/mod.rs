//! REST API layer: route handlers and router composition.
//!
//! The SSE stream and statistics endpoints are mounted under `/api/v1`;
//! the health check sits at the root.

pub mod handlers;

use axum::Router;

use crate::app_state::AppState;

/// Builds the complete API router with all REST endpoints.
pub fn build_router() -> Router<AppState> {
    Router::new()
        .nest("/api/v1", handlers::routes())
        .merge(handlers::system::routes())
}
