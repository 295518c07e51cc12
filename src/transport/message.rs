use serde::{Deserialize, Serialize};

use crate::ingest::reading::{Reading, ReadingInput};
use crate::stats::StatsSnapshot;

/// Frames a client may send. The protocol is JSON, tagged by `type`.
#[derive(Debug, Deserialize, Serialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Direct-path write: validated, scored, persisted, answered with
    /// `ingested` or `rejected`.
    #[serde(rename = "ingest")]
    Ingest {
        channel_id: String,
        credential: String,
        #[serde(flatten)]
        reading: ReadingInput,
    },

    /// Broker-path write (or any other publish to an allowed topic).
    #[serde(rename = "publish")]
    Publish {
        topic: String,
        payload: String,
        message_id: Option<String>,
        qos: Option<u8>,
        retain: Option<bool>,
    },

    #[serde(rename = "subscribe")]
    Subscribe { topic: String, qos: Option<u8> },

    #[serde(rename = "unsubscribe")]
    Unsubscribe { topic: String },

    /// Subscriber acknowledgment of a QoS 1 delivery.
    #[serde(rename = "ack")]
    Ack { message_id: String },

    /// Subscriber receipt of a QoS 2 delivery.
    #[serde(rename = "pubrec")]
    PubRec { message_id: String },

    /// Publisher release of a held QoS 2 publish.
    #[serde(rename = "pubrel")]
    PubRel { message_id: String },

    /// Subscriber completion of a QoS 2 delivery.
    #[serde(rename = "pubcomp")]
    PubComp { message_id: String },

    /// Observer control: enter a channel's room.
    #[serde(rename = "join")]
    Join {
        channel_id: String,
        credential: Option<String>,
    },

    /// Observer control: leave a channel's room.
    #[serde(rename = "leave")]
    Leave { channel_id: String },

    #[serde(rename = "stats")]
    Stats {},
}

/// Frames the server may send.
#[derive(Debug, Deserialize, Serialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// Direct-path success: the full enriched reading.
    #[serde(rename = "ingested")]
    Ingested { reading: Reading },

    /// Direct-path rejection with a stable machine-readable reason.
    #[serde(rename = "rejected")]
    Rejected { reason: String, detail: String },

    /// A broker delivery to a subscriber.
    #[serde(rename = "message")]
    Message {
        topic: String,
        payload: String,
        timestamp: i64,
        message_id: String,
        qos: u8,
        duplicate: bool,
    },

    #[serde(rename = "suback")]
    SubAck { topic: String, granted_qos: u8 },

    #[serde(rename = "pubrec")]
    PubRec { message_id: String },

    #[serde(rename = "pubrel")]
    PubRel { message_id: String },

    #[serde(rename = "pubcomp")]
    PubComp { message_id: String },

    /// Room membership confirmation.
    #[serde(rename = "joined")]
    Joined { channel_id: String },

    /// Fanout push of a new reading to a joined observer.
    #[serde(rename = "reading")]
    Reading {
        channel_id: String,
        reading: Reading,
        server_emit_time: i64,
    },

    #[serde(rename = "error")]
    Error { message: String },

    #[serde(rename = "stats")]
    Stats { stats: StatsSnapshot },
}
