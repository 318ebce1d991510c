//! Registry of live WebSocket connections.
//!
//! Holds each connection's outbound frame queue so command side effects
//! can be broadcast to every connected client, independent of their
//! filter subscriptions. This is a separate primitive from the filtered
//! publish path in [`crate::stream::StreamService`].

use std::collections::HashMap;

use tokio::sync::RwLock;
use tokio::sync::mpsc;

use super::messages::ServerMessage;
use crate::domain::ConnectionId;

/// Bookkeeping for one live connection.
#[derive(Debug)]
struct ConnectionEntry {
    sender: mpsc::UnboundedSender<ServerMessage>,
    user_id: Option<String>,
}

/// Central store of live connections and their outbound queues.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<ConnectionId, ConnectionEntry>>,
}

impl ConnectionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a connection's outbound queue.
    pub async fn insert(
        &self,
        id: ConnectionId,
        sender: mpsc::UnboundedSender<ServerMessage>,
        user_id: Option<String>,
    ) {
        self.connections
            .write()
            .await
            .insert(id, ConnectionEntry { sender, user_id });
    }

    /// Removes a connection. Idempotent.
    pub async fn remove(&self, id: ConnectionId) -> bool {
        self.connections.write().await.remove(&id).is_some()
    }

    /// Queues a frame for every live connection.
    ///
    /// A connection whose queue is closed is skipped; its own task is
    /// responsible for deregistering it. Returns the number of
    /// connections the frame was queued for.
    pub async fn broadcast_all(&self, message: &ServerMessage) -> usize {
        let connections = self.connections.read().await;
        let mut queued = 0;
        for entry in connections.values() {
            if entry.sender.send(message.clone()).is_ok() {
                queued += 1;
            }
        }
        queued
    }

    /// Returns the user id recorded for a connection, if any.
    pub async fn user_id(&self, id: ConnectionId) -> Option<String> {
        self.connections
            .read()
            .await
            .get(&id)
            .and_then(|e| e.user_id.clone())
    }

    /// Returns the number of live connections.
    pub async fn len(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Returns `true` if no connections are registered.
    pub async fn is_empty(&self) -> bool {
        self.connections.read().await.is_empty()
    }
}
