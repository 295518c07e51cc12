//! The `ingest` module accepts sensor readings, scores them, persists
//! them, and hands them to the fanout router.
//!
//! Readings arrive two ways: a direct request that gets a typed response,
//! and broker deliveries consumed by an in-process privileged subscriber
//! on `sensors/+/readings`. Both run the same validate, score, persist,
//! emit sequence; only the direct path can report failures to the caller.

pub mod gateway;
pub mod reading;
pub mod subscriber;

pub use gateway::IngestGateway;
pub use reading::{Reading, ReadingInput};
