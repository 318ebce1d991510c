//! WebSocket layer: connection handling, message routing, liveness.
//!
//! The WebSocket endpoint at `/ws` provides bidirectional communication:
//! filtered event subscriptions flowing out, commands and queries
//! flowing in.

pub mod connection;
pub mod handler;
pub mod identity;
pub mod messages;
pub mod registry;
