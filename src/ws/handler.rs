//! Axum WebSocket upgrade handler.

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Query, State};
use axum::response::IntoResponse;

use super::connection::run_connection;
use super::identity::{ClientIdentity, IdentityParams};
use crate::app_state::AppState;

/// `GET /ws` — Upgrade HTTP connection to WebSocket.
///
/// The identity collaborator supplies `user_id` and `permissions` as
/// query parameters; both are treated as opaque. Upgrades happen only
/// on this route — every other path 404s without a handshake.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<IdentityParams>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let identity = ClientIdentity::from_params(&params);
    ws.on_upgrade(move |socket| run_connection(socket, state, identity))
}
