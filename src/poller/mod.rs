//! Poller set: per-category timers pulling new rows from the store and
//! publishing them as events.
//!
//! Known limitation: rows beyond the per-poll cap inside one interval
//! are skipped; the watermark-only cursor cannot detect the overflow.

pub mod mapping;
pub mod set;

pub use set::{PollCategory, PollerSet, PollerSettings, poll_once};
