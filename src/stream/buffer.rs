//! Bounded ring buffer of recent events.
//!
//! Holds the most recent N published events for late-subscriber replay.
//! Eviction is strictly oldest-first: by insertion order when the buffer
//! is at capacity, and by age during periodic maintenance sweeps.

use std::collections::VecDeque;

use chrono::{DateTime, Duration, Utc};

use crate::domain::{StreamEvent, SubscriptionFilters};

/// Fixed-capacity FIFO store of recent [`StreamEvent`]s.
///
/// Invariant: `len() <= capacity` at all times.
#[derive(Debug)]
pub struct EventBuffer {
    events: VecDeque<StreamEvent>,
    capacity: usize,
    retention: Duration,
}

impl EventBuffer {
    /// Creates an empty buffer holding at most `capacity` events, each
    /// retained for at most `retention`.
    #[must_use]
    pub fn new(capacity: usize, retention: std::time::Duration) -> Self {
        Self {
            events: VecDeque::with_capacity(capacity),
            capacity,
            retention: Duration::from_std(retention).unwrap_or_else(|_| Duration::seconds(300)),
        }
    }

    /// Appends an event, evicting the oldest one when at capacity.
    ///
    /// Returns the evicted event, if any.
    pub fn push(&mut self, event: StreamEvent) -> Option<StreamEvent> {
        let evicted = if self.events.len() >= self.capacity {
            self.events.pop_front()
        } else {
            None
        };
        self.events.push_back(event);
        evicted
    }

    /// Removes every buffered event older than the retention window
    /// relative to `now`. Returns the number of events removed.
    pub fn purge_expired(&mut self, now: DateTime<Utc>) -> usize {
        let cutoff = now - self.retention;
        let before = self.events.len();
        self.events.retain(|e| e.timestamp >= cutoff);
        before - self.events.len()
    }

    /// Returns buffered events matching the filters, ascending by
    /// timestamp. Used for time-range replay on subscribe.
    #[must_use]
    pub fn matching(&self, filters: &SubscriptionFilters) -> Vec<StreamEvent> {
        let mut matched: Vec<StreamEvent> = self
            .events
            .iter()
            .filter(|e| filters.matches(e))
            .cloned()
            .collect();
        matched.sort_by_key(|e| e.timestamp);
        matched
    }

    /// Returns `true` if an event with the given id is buffered.
    #[must_use]
    pub fn contains(&self, event_id: &str) -> bool {
        self.events.iter().any(|e| e.id == event_id)
    }

    /// Returns the number of buffered events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns `true` if no events are buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
