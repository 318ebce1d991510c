//! Stream events: the value type flowing from pollers to subscribers.
//!
//! A [`StreamEvent`] is created by a poller (from a store row) or by a
//! command handler broadcast, published through the
//! [`crate::stream::StreamService`], and never mutated afterwards. It is
//! destroyed only by ring-buffer eviction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Category of a manufacturing event.
///
/// Serialized as the wire-level `type` discriminator of every event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventCategory {
    /// Process or performance metric reading.
    Metric,
    /// Threshold breach or anomaly alert.
    Alert,
    /// Equipment state change.
    Equipment,
    /// Quality check reading.
    Quality,
    /// Maintenance activity.
    Maintenance,
    /// Production count or rate update.
    Production,
}

impl EventCategory {
    /// Returns the category as a static string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Metric => "metric",
            Self::Alert => "alert",
            Self::Equipment => "equipment",
            Self::Quality => "quality",
            Self::Maintenance => "maintenance",
            Self::Production => "production",
        }
    }
}

impl std::fmt::Display for EventCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity attached to alert-like events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational, no action needed.
    Info,
    /// Degraded but operating.
    Warning,
    /// Fault requiring attention.
    Error,
    /// Production-stopping condition.
    Critical,
}

impl Severity {
    /// Returns the severity as a static string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single manufacturing event as delivered to subscribers.
///
/// Immutable once published. The `data` payload is opaque to the
/// streaming layer; its shape depends on the category.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamEvent {
    /// Unique event identifier, `<category>-<uuid>`.
    pub id: String,
    /// Event category (wire name `type`).
    #[serde(rename = "type")]
    pub category: EventCategory,
    /// Event timestamp (usually the source row's recording time).
    pub timestamp: DateTime<Utc>,
    /// Category-specific payload.
    pub data: serde_json::Value,
    /// Human-readable origin (equipment or line name).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Severity, present on alert-like events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
}

impl StreamEvent {
    /// Creates a new event with a generated id and the given timestamp.
    #[must_use]
    pub fn new(category: EventCategory, timestamp: DateTime<Utc>, data: serde_json::Value) -> Self {
        Self {
            id: format!("{}-{}", category.as_str(), uuid::Uuid::new_v4()),
            category,
            timestamp,
            data,
            source: None,
            severity: None,
        }
    }

    /// Sets the human-readable source.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Sets the severity.
    #[must_use]
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }

    /// Returns the equipment id carried in the payload, if any.
    ///
    /// Filter matching on the `equipment` dimension reads this value.
    #[must_use]
    pub fn equipment_id(&self) -> Option<&str> {
        self.data.get("equipmentId").and_then(|v| v.as_str())
    }
}
