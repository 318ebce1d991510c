//! Pub/sub core: subscription registry, bounded ring buffer, fan-out.
//!
//! Pollers publish into [`StreamService`]; transport adapters subscribe
//! and forward delivered events to their clients.

pub mod buffer;
pub mod service;
pub mod subscription;

pub use buffer::EventBuffer;
pub use service::{StreamService, StreamSettings};
pub use subscription::Subscription;
