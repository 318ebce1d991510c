//! Fire-and-forget operational counters.
//!
//! Counters are process-local atomics incremented from hot paths without
//! ever failing or blocking; streaming correctness never depends on
//! them. A snapshot is exposed through the stats endpoint.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Process-local counter sink.
#[derive(Debug, Default)]
pub struct Telemetry {
    connections_opened: AtomicU64,
    connections_closed: AtomicU64,
    messages_received: AtomicU64,
    messages_sent: AtomicU64,
    events_published: AtomicU64,
    deliveries_dropped: AtomicU64,
    poll_errors: AtomicU64,
}

/// Point-in-time copy of all counters.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TelemetrySnapshot {
    /// WebSocket connections accepted since startup.
    pub connections_opened: u64,
    /// WebSocket connections closed since startup.
    pub connections_closed: u64,
    /// Inbound WebSocket messages handled.
    pub messages_received: u64,
    /// Outbound frames sent across all transports.
    pub messages_sent: u64,
    /// Events published into the pub/sub core.
    pub events_published: u64,
    /// Deliveries dropped because a subscriber was gone or lagging.
    pub deliveries_dropped: u64,
    /// Poll cycles that failed against the store.
    pub poll_errors: u64,
}

impl Telemetry {
    /// Creates a zeroed counter sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts an accepted WebSocket connection.
    pub fn connection_opened(&self) {
        self.connections_opened.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts a closed WebSocket connection.
    pub fn connection_closed(&self) {
        self.connections_closed.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts an inbound message.
    pub fn message_received(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts an outbound frame.
    pub fn message_sent(&self) {
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts a published event.
    pub fn event_published(&self) {
        self.events_published.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts a dropped delivery.
    pub fn delivery_dropped(&self) {
        self.deliveries_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts a failed poll cycle.
    pub fn poll_error(&self) {
        self.poll_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns a point-in-time copy of all counters.
    #[must_use]
    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            connections_opened: self.connections_opened.load(Ordering::Relaxed),
            connections_closed: self.connections_closed.load(Ordering::Relaxed),
            messages_received: self.messages_received.load(Ordering::Relaxed),
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            events_published: self.events_published.load(Ordering::Relaxed),
            deliveries_dropped: self.deliveries_dropped.load(Ordering::Relaxed),
            poll_errors: self.poll_errors.load(Ordering::Relaxed),
        }
    }
}
