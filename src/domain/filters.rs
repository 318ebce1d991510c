//! Subscription filters and event matching.
//!
//! Filters are pure predicates: evaluating them never blocks and never
//! has side effects. An absent or empty dimension matches every event.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::event::{EventCategory, Severity, StreamEvent};

/// Inclusive timestamp window used both for replay and live matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeRange {
    /// Window start, inclusive.
    pub start: DateTime<Utc>,
    /// Window end, inclusive.
    pub end: DateTime<Utc>,
}

impl TimeRange {
    /// Returns `true` if the timestamp lies within `[start, end]`.
    #[must_use]
    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        timestamp >= self.start && timestamp <= self.end
    }
}

/// Per-subscription event filters.
///
/// Each dimension is optional; `None` (or an empty list) matches all
/// events on that dimension.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionFilters {
    /// Event categories to receive.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub types: Option<Vec<EventCategory>>,
    /// Equipment ids to receive events for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equipment: Option<Vec<String>>,
    /// Severities to receive.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Vec<Severity>>,
    /// Restrict to events whose timestamp lies in this window.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_range: Option<TimeRange>,
}

impl SubscriptionFilters {
    /// Returns `true` if the event passes every non-empty dimension.
    #[must_use]
    pub fn matches(&self, event: &StreamEvent) -> bool {
        if let Some(types) = &self.types
            && !types.is_empty()
            && !types.contains(&event.category)
        {
            return false;
        }

        if let Some(equipment) = &self.equipment
            && !equipment.is_empty()
        {
            let Some(id) = event.equipment_id() else {
                return false;
            };
            if !equipment.iter().any(|e| e == id) {
                return false;
            }
        }

        if let Some(severities) = &self.severity
            && !severities.is_empty()
        {
            let Some(severity) = event.severity else {
                return false;
            };
            if !severities.contains(&severity) {
                return false;
            }
        }

        if let Some(range) = &self.time_range
            && !range.contains(event.timestamp)
        {
            return false;
        }

        true
    }
}
