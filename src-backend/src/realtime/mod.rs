//! Realtime Layer
//!
//! Fan-out of committed row changes to list subscriptions.

mod hub;

pub use hub::{RealtimeHub, DEFAULT_CAPACITY};
