//! Streaming error types with HTTP status code mapping.
//!
//! [`StreamError`] is the central error type for the gateway. Every
//! per-event, per-message, and per-poll failure is contained to the
//! event/message/poller it belongs to; variants exist so each failure
//! site can record what was contained. REST handlers additionally map
//! variants to HTTP status codes and a structured JSON body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Structured JSON error response body.
///
/// All REST error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 1001,
///     "message": "invalid message: missing field `type`",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Central error enum for the streaming gateway.
///
/// # Error Code Ranges
///
/// | Range     | Category              | HTTP Status                |
/// |-----------|-----------------------|----------------------------|
/// | 1000–1999 | Protocol / Validation | 400 Bad Request            |
/// | 2000–2999 | Unknown operation     | 404 Not Found              |
/// | 3000–3999 | Server / Store        | 500 Internal Server Error  |
/// | 4000–4999 | Permission            | 403 Forbidden              |
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// The store was unreachable during a poll. The poll cycle is
    /// skipped and the category watermark stays unchanged.
    #[error("transient source error polling {category}: {message}")]
    TransientSource {
        /// Category whose poll failed.
        category: String,
        /// Underlying store error message.
        message: String,
    },

    /// Malformed or invalid inbound message. The connection stays open.
    #[error("invalid message: {0}")]
    Protocol(String),

    /// A command was attempted without the `write` permission.
    #[error("permission denied: {0} requires write access")]
    Permission(String),

    /// Unrecognized command name.
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    /// Unrecognized query name.
    #[error("Unknown query: {0}")]
    UnknownQuery(String),

    /// Unrecognized message envelope type.
    #[error("Unknown message type")]
    UnknownMessageType,

    /// A subscriber channel was closed or lagging during fan-out.
    /// Isolated: other subscribers still receive the event.
    #[error("delivery failed for subscription {0}")]
    Delivery(crate::domain::SubscriptionId),

    /// A command targeted a row that does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Persistence failure surfaced to a correlated command or query.
    #[error("store error: {0}")]
    Store(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl StreamError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::Protocol(_) => 1001,
            Self::UnknownMessageType => 1002,
            Self::UnknownCommand(_) => 2001,
            Self::UnknownQuery(_) => 2002,
            Self::NotFound(_) => 2003,
            Self::TransientSource { .. } => 3001,
            Self::Store(_) => 3002,
            Self::Delivery(_) => 3003,
            Self::Internal(_) => 3000,
            Self::Permission(_) => 4001,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Protocol(_) | Self::UnknownMessageType => StatusCode::BAD_REQUEST,
            Self::UnknownCommand(_) | Self::UnknownQuery(_) | Self::NotFound(_) => {
                StatusCode::NOT_FOUND
            }
            Self::Permission(_) => StatusCode::FORBIDDEN,
            Self::TransientSource { .. }
            | Self::Store(_)
            | Self::Delivery(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for StreamError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}
