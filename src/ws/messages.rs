//! WebSocket message envelopes.
//!
//! Inbound and outbound frames are JSON envelopes. The optional `id`
//! correlates a request with its response; pushed `event` frames carry
//! none.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Inbound message type discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientMessageType {
    /// Replace the connection's subscription.
    Subscribe,
    /// Clear the connection's subscription.
    Unsubscribe,
    /// Execute a mutating command.
    Command,
    /// Execute a read-only query.
    Query,
    /// Application-level ping, answered with `pong`.
    Ping,
    /// Any type string this server does not know.
    #[serde(other)]
    Unknown,
}

/// Inbound message envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientMessage {
    /// Message type discriminator.
    #[serde(rename = "type")]
    pub msg_type: ClientMessageType,
    /// Type-specific payload.
    #[serde(default)]
    pub data: Option<serde_json::Value>,
    /// Client-chosen correlation id.
    #[serde(default)]
    pub id: Option<String>,
}

/// Outbound message type discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerMessageType {
    /// Pushed stream or broadcast event.
    Event,
    /// Successful reply to a correlatable request.
    Response,
    /// Failed reply to a correlatable request.
    Error,
    /// Reply to an application-level ping.
    Pong,
}

/// Outbound message envelope.
#[derive(Debug, Clone, Serialize)]
pub struct ServerMessage {
    /// Message type discriminator.
    #[serde(rename = "type")]
    pub msg_type: ServerMessageType,
    /// Type-specific payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    /// Correlation id echoed from the request, when there was one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Server-side send timestamp.
    pub timestamp: DateTime<Utc>,
}

impl ServerMessage {
    /// Builds a pushed `event` frame.
    #[must_use]
    pub fn event(data: serde_json::Value) -> Self {
        Self {
            msg_type: ServerMessageType::Event,
            data: Some(data),
            id: None,
            timestamp: Utc::now(),
        }
    }

    /// Builds a `response` frame correlated to `id`.
    #[must_use]
    pub fn response(id: Option<String>, data: serde_json::Value) -> Self {
        Self {
            msg_type: ServerMessageType::Response,
            data: Some(data),
            id,
            timestamp: Utc::now(),
        }
    }

    /// Builds an `error` frame with an `{ "error": <message> }` payload.
    #[must_use]
    pub fn error(id: Option<String>, message: impl std::fmt::Display) -> Self {
        Self {
            msg_type: ServerMessageType::Error,
            data: Some(serde_json::json!({ "error": message.to_string() })),
            id,
            timestamp: Utc::now(),
        }
    }

    /// Builds a `pong` frame echoing the ping's `id`.
    #[must_use]
    pub fn pong(id: Option<String>) -> Self {
        Self {
            msg_type: ServerMessageType::Pong,
            data: None,
            id,
            timestamp: Utc::now(),
        }
    }
}
