//! WebSocket connection state machine.
//!
//! Runs the read/write loop for a single connection: dispatches inbound
//! envelopes, forwards subscribed events, and probes liveness with
//! protocol-level pings. One socket maps to one connection holding at
//! most one subscription at a time.

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::sync::broadcast;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::identity::ClientIdentity;
use super::messages::{ClientMessage, ClientMessageType, ServerMessage};
use crate::app_state::AppState;
use crate::domain::{ConnectionId, StreamEvent, SubscriptionFilters, SubscriptionId};
use crate::error::StreamError;

/// A held subscription: its id plus the forward task draining the
/// delivery channel into the connection's outbound queue.
type HeldSubscription = (SubscriptionId, JoinHandle<()>);

/// Runs the read/write loop for a single WebSocket connection.
///
/// Teardown always unsubscribes a held subscription and deregisters the
/// connection, so no orphaned subscription survives a disconnect.
pub async fn run_connection(socket: WebSocket, state: AppState, identity: ClientIdentity) {
    let conn_id = ConnectionId::new();
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<ServerMessage>();
    state
        .connections
        .insert(conn_id, out_tx.clone(), identity.user_id.clone())
        .await;
    state.telemetry.connection_opened();
    tracing::info!(connection = %conn_id, user = ?identity.user_id, "ws connected");

    let welcome = ServerMessage::event(json!({
        "message": "connected",
        "connectionId": conn_id,
        "capabilities": ["streaming", "commands", "queries"],
    }));
    let _ = out_tx.send(welcome);

    let (mut ws_tx, mut ws_rx) = socket.split();
    let mut subscription: Option<HeldSubscription> = None;
    let mut last_seen = Instant::now();
    let mut heartbeat = tokio::time::interval(state.heartbeat_interval);
    heartbeat.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first tick completes immediately.
    heartbeat.tick().await;

    loop {
        tokio::select! {
            inbound = ws_rx.next() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => {
                        state.telemetry.message_received();
                        handle_message(&state, &identity, &mut subscription, &out_tx, &text).await;
                    }
                    Some(Ok(Message::Pong(_))) => {
                        last_seen = Instant::now();
                    }
                    Some(Ok(Message::Ping(payload))) => {
                        if ws_tx.send(Message::Pong(payload)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        tracing::debug!(connection = %conn_id, error = %err, "ws read error");
                        break;
                    }
                }
            }
            outbound = out_rx.recv() => {
                let Some(frame) = outbound else { break };
                let Ok(text) = serde_json::to_string(&frame) else {
                    tracing::warn!(connection = %conn_id, "outbound frame serialization failed");
                    continue;
                };
                if ws_tx.send(Message::text(text)).await.is_err() {
                    break;
                }
                state.telemetry.message_sent();
            }
            _ = heartbeat.tick() => {
                if liveness_expired(last_seen, state.heartbeat_interval) {
                    tracing::warn!(connection = %conn_id, "heartbeat unanswered, terminating");
                    break;
                }
                if ws_tx.send(Message::Ping(Vec::new().into())).await.is_err() {
                    break;
                }
            }
        }
    }

    if let Some((sub_id, forward)) = subscription.take() {
        state.stream.unsubscribe(sub_id).await;
        forward.abort();
    }
    state.connections.remove(conn_id).await;
    state.telemetry.connection_closed();
    tracing::info!(connection = %conn_id, "ws disconnected");
}

/// A peer is dead once it has answered no ping for two whole heartbeat
/// intervals: the tick after a sent ping still sees `last_seen` within
/// one interval, so only a second consecutive silent tick terminates.
/// Detection therefore happens within two intervals, and a peer that
/// answers at least one ping per interval is never terminated.
fn liveness_expired(last_seen: Instant, interval: std::time::Duration) -> bool {
    last_seen.elapsed() >= interval * 2
}

/// Handles one inbound text frame.
///
/// Every failure is contained to this message: the client gets an error
/// frame (correlated when the message carried an `id`) and the
/// connection stays open.
async fn handle_message(
    state: &AppState,
    identity: &ClientIdentity,
    subscription: &mut Option<HeldSubscription>,
    out_tx: &mpsc::UnboundedSender<ServerMessage>,
    text: &str,
) {
    let msg = match serde_json::from_str::<ClientMessage>(text) {
        Ok(msg) => msg,
        Err(err) => {
            tracing::debug!(error = %err, "malformed ws message");
            let frame = ServerMessage::error(None, StreamError::Protocol(err.to_string()));
            let _ = out_tx.send(frame);
            return;
        }
    };

    let frame = match msg.msg_type {
        ClientMessageType::Subscribe => {
            handle_subscribe(state, identity, subscription, out_tx, &msg).await
        }
        ClientMessageType::Unsubscribe => {
            if let Some((old_id, forward)) = subscription.take() {
                state.stream.unsubscribe(old_id).await;
                forward.abort();
            }
            ServerMessage::response(msg.id, json!({ "unsubscribed": true }))
        }
        ClientMessageType::Command => {
            match state
                .dispatcher
                .execute_command(identity, msg.data.as_ref())
                .await
            {
                Ok(result) => ServerMessage::response(msg.id, result),
                Err(err) => ServerMessage::error(msg.id, err),
            }
        }
        ClientMessageType::Query => {
            match state
                .dispatcher
                .execute_query(identity, msg.data.as_ref())
                .await
            {
                Ok(result) => ServerMessage::response(msg.id, result),
                Err(err) => ServerMessage::error(msg.id, err),
            }
        }
        ClientMessageType::Ping => ServerMessage::pong(msg.id),
        ClientMessageType::Unknown => ServerMessage::error(msg.id, StreamError::UnknownMessageType),
    };
    let _ = out_tx.send(frame);
}

/// Replaces the connection's subscription with a new one built from the
/// message's `filters` payload.
async fn handle_subscribe(
    state: &AppState,
    identity: &ClientIdentity,
    subscription: &mut Option<HeldSubscription>,
    out_tx: &mpsc::UnboundedSender<ServerMessage>,
    msg: &ClientMessage,
) -> ServerMessage {
    let filters = match msg.data.as_ref().and_then(|d| d.get("filters")) {
        Some(raw) => match serde_json::from_value::<SubscriptionFilters>(raw.clone()) {
            Ok(filters) => filters,
            Err(err) => {
                return ServerMessage::error(
                    msg.id.clone(),
                    StreamError::Protocol(format!("invalid filters: {err}")),
                );
            }
        },
        None => SubscriptionFilters::default(),
    };

    // Re-subscribing atomically replaces the previous subscription.
    if let Some((old_id, forward)) = subscription.take() {
        state.stream.unsubscribe(old_id).await;
        forward.abort();
    }

    let (sub_id, receiver) = state
        .stream
        .subscribe(filters.clone(), identity.user_id.clone())
        .await;
    let forward = spawn_forward(
        receiver,
        out_tx.clone(),
        std::sync::Arc::clone(&state.telemetry),
    );
    *subscription = Some((sub_id, forward));

    ServerMessage::response(
        msg.id.clone(),
        json!({
            "subscribed": true,
            "subscriptionId": sub_id.to_string(),
            "filters": filters,
        }),
    )
}

/// Drains a subscription's delivery channel into the connection's
/// outbound queue. Lag means the consumer was slower than the channel
/// capacity: the oldest undelivered events are dropped, producers are
/// never slowed.
fn spawn_forward(
    mut receiver: broadcast::Receiver<StreamEvent>,
    out_tx: mpsc::UnboundedSender<ServerMessage>,
    telemetry: std::sync::Arc<crate::telemetry::Telemetry>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    let payload = serde_json::to_value(&event).unwrap_or_default();
                    if out_tx.send(ServerMessage::event(payload)).is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    telemetry.delivery_dropped();
                    tracing::warn!(lagged = n, "ws client lagged behind event stream");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}
