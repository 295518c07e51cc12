//! Message definitions for the broker
//!
//! `Message` is the canonical internal representation of one publish.
//! Fields are chosen to support the three delivery tiers:
//!
//! - `topic`: routing key
//! - `payload`: JSON-serializable body as a String (the protocol is JSON)
//! - `timestamp`: milliseconds since UNIX epoch, set by the broker upon publish
//! - `message_id`: opaque unique id used for QoS 1/2 acknowledgment
//!   tracking; the broker generates one if the publisher does not
//! - `qos`: delivery tier. `0` = at-most-once, `1` = at-least-once,
//!   `2` = exactly-once
//! - `retain`: cache this publish as the topic's retained message and
//!   replay it to future matching subscribers

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub topic: String,
    pub payload: String,
    pub timestamp: i64,
    pub message_id: String,
    pub qos: u8,
    pub retain: bool,
}
