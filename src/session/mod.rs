//! The `session` module defines the representation of a connected peer.
//!
//! A `Session` is one live WebSocket connection, whether it belongs to a
//! device, an observer, or the in-process ingestion subscriber. The same
//! handle is registered with the broker (for topic subscriptions) and the
//! fanout router (for room membership); both push outbound frames through
//! the session's channel sender.

pub mod handle;
pub use handle::{Session, SessionId};
