//! The in-process privileged broker subscriber that feeds the gateway.
//!
//! It registers a session like any other subscriber, subscribes to
//! `sensors/+/readings` at QoS 2, and consumes deliveries off its channel
//! in a background task. Acknowledgments are short-circuited straight into
//! the broker since both ends live in this process.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tracing::info;
use tungstenite::protocol::Message as WsMessage;

use crate::broker::Broker;
use crate::ingest::IngestGateway;
use crate::session::Session;
use crate::transport::message::ServerMessage;

pub const GATEWAY_SESSION_ID: &str = "ingest-gateway";

/// Register the gateway as a privileged subscriber and spawn the task that
/// drains its deliveries. Returns the spawned task handle.
pub fn spawn_pubsub_ingest(
    broker: Arc<Mutex<Broker>>,
    gateway: Arc<IngestGateway>,
) -> tokio::task::JoinHandle<()> {
    let (tx, mut rx) = mpsc::unbounded_channel::<WsMessage>();
    let session = Session::internal(GATEWAY_SESSION_ID, tx);
    let session_id = session.id.clone();

    {
        let mut broker_lock = broker.lock().unwrap();
        broker_lock.register_session(session);
        broker_lock
            .subscribe(&session_id, "sensors/+/readings", 2)
            .expect("privileged subscription cannot be rejected");
    }
    info!("ingestion gateway subscribed to sensors/+/readings");

    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let WsMessage::Text(text) = msg else {
                continue;
            };
            let Ok(frame) = serde_json::from_str::<ServerMessage>(&text) else {
                continue;
            };
            match frame {
                ServerMessage::Message {
                    topic,
                    payload,
                    message_id,
                    qos,
                    ..
                } => {
                    // Dedupe inside the gateway makes reprocessing a
                    // duplicate-marked redelivery harmless.
                    gateway.ingest_from_broker(&topic, &payload, &message_id);

                    let mut broker_lock = broker.lock().unwrap();
                    match qos {
                        0 => {}
                        1 => broker_lock.handle_ack(&session_id, &message_id),
                        _ => broker_lock.handle_pubrec(&session_id, &message_id),
                    }
                }
                // Broker released a qos 2 delivery; complete the handshake.
                ServerMessage::PubRel { message_id } => {
                    broker.lock().unwrap().handle_pubcomp(&session_id, &message_id);
                }
                _ => {}
            }
        }
    })
}
