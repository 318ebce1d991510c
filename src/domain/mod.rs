//! Domain layer: event model, identifiers, and subscription filters.
//!
//! This module contains the shared value types flowing through the
//! system: stream events with their category and severity taxonomy,
//! type-safe subscription/connection identifiers, and the pure-predicate
//! filters subscriptions are matched with.

pub mod event;
pub mod filters;
pub mod ids;

pub use event::{EventCategory, Severity, StreamEvent};
pub use filters::{SubscriptionFilters, TimeRange};
pub use ids::{ConnectionId, SubscriptionId};
