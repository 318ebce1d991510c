//! Shared application state injected into all Axum handlers.

use std::sync::Arc;
use std::time::Duration;

use crate::dispatch::Dispatcher;
use crate::stream::StreamService;
use crate::telemetry::Telemetry;
use crate::ws::registry::ConnectionRegistry;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Pub/sub core for subscriptions and publishing.
    pub stream: Arc<StreamService>,
    /// Command/query dispatcher.
    pub dispatcher: Arc<Dispatcher>,
    /// Live WebSocket connection registry.
    pub connections: Arc<ConnectionRegistry>,
    /// Fire-and-forget counter sink.
    pub telemetry: Arc<Telemetry>,
    /// Interval between heartbeat ticks per connection.
    pub heartbeat_interval: Duration,
}
