//! REST endpoint handlers organized by resource.

pub mod stream;
pub mod system;

use axum::Router;
use axum::routing::get;

use crate::app_state::AppState;

/// Composes all resource routes mounted under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/stream/sse", get(stream::sse_handler))
        .route("/stream/stats", get(system::stats_handler))
}
