//! # factory-stream
//!
//! Real-time manufacturing event streaming gateway over SSE and
//! WebSocket.
//!
//! Per-category pollers pull new rows from the manufacturing store,
//! convert them into events, and publish them through an in-memory
//! pub/sub core. Transport adapters fan matching events out to SSE and
//! WebSocket consumers; WebSocket clients send mutating commands and
//! point-in-time queries back through a name-routed dispatcher.
//!
//! ## Architecture
//!
//! ```text
//! PostgreSQL store
//!     │
//!     ├── PollerSet (poller/)          per-category watermark polls
//!     │
//!     ├── StreamService (stream/)      ring buffer + subscriptions
//!     │
//!     ├── SSE Handler (api/)           one stream = one subscription
//!     ├── WS Handler (ws/)             one socket = one connection
//!     │
//!     └── Dispatcher (dispatch/)       commands + queries ⇄ store
//! ```
//!
//! Delivery is at-most-once and in-memory only: a slow consumer never
//! slows producers, it just risks missing events once its channel or
//! the ring buffer evicts them.

pub mod api;
pub mod app_state;
pub mod config;
pub mod dispatch;
pub mod domain;
pub mod error;
pub mod poller;
pub mod store;
pub mod stream;
pub mod telemetry;
pub mod ws;
