//! Broker engine
//!
//! This module contains the in-memory topic router responsible for:
//! - managing subscription patterns and subscriber lists
//! - authorizing publishes and subscriptions against the topic allow-list
//! - delivering publishes per recipient under the QoS 0/1/2 contracts
//! - caching retained messages and replaying them to new subscribers
//!
//! Concurrency and usage notes:
//! - The public API here is synchronous and designed to be held behind a
//!   lock (`Arc<Mutex<Broker>>`) by the transport layer. Callers should
//!   avoid holding the broker lock across network I/O to prevent blocking
//!   other operations.
//! - The retry loop is designed to be run as a background task and
//!   re-sends pending QoS 1/2 frames when acknowledgments are not received
//!   within the configured window. Retries are capped; an exhausted record
//!   is dropped and only visible through the error counters, never to the
//!   original publisher.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};
use tungstenite::protocol::Message as WsMessage;
use uuid::Uuid;

use crate::broker::message::Message;
use crate::broker::topic::{self, Subscription};
use crate::config::BrokerSettings;
use crate::session::{Session, SessionId};
use crate::stats::Stats;
use crate::transport::message::ServerMessage;
use crate::utils::error::BrokerError;

/// Which acknowledgment a delivery record is waiting on.
///
/// QoS 1 records wait for `ack`. QoS 2 records walk the
/// message → `pubrec` → `pubrel` → `pubcomp` handshake, so they first wait
/// for the recipient's `pubrec` and then for its `pubcomp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryStage {
    AwaitingAck,
    AwaitingRec,
    AwaitingComp,
}

/// One in-flight delivery to one recipient.
#[derive(Debug, Clone)]
pub struct DeliveryRecord {
    pub message: Message,
    pub stage: DeliveryStage,
    pub sent_at: i64,
    pub retries: u8,
}

#[derive(Debug)]
pub struct Broker {
    pub subscriptions: HashMap<String, Subscription>,
    pub sessions: HashMap<SessionId, Session>,
    /// In-flight deliveries keyed by (message id, recipient).
    pub pending: HashMap<(String, SessionId), DeliveryRecord>,
    /// QoS 2 publishes held until the publisher's `pubrel`, keyed by
    /// message id. The publishing session rides along so release is bound
    /// to it and its held publishes die with it.
    inbound_qos2: HashMap<String, (SessionId, Message)>,
    /// Last retained publish per topic.
    retained: HashMap<String, Message>,
    allowed_prefixes: Vec<String>,
    max_qos: u8,
    ack_timeout_ms: i64,
    max_retries: u8,
    stats: Arc<Stats>,
}

impl Broker {
    pub fn new(settings: &BrokerSettings, stats: Arc<Stats>) -> Self {
        Self {
            subscriptions: HashMap::new(),
            sessions: HashMap::new(),
            pending: HashMap::new(),
            inbound_qos2: HashMap::new(),
            retained: HashMap::new(),
            allowed_prefixes: settings.allowed_topic_prefixes.clone(),
            max_qos: settings.max_qos,
            ack_timeout_ms: settings.ack_timeout_ms,
            max_retries: settings.max_retries,
            stats,
        }
    }

    pub fn register_session(&mut self, session: Session) {
        self.sessions.insert(session.id.clone(), session);
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    fn is_privileged(&self, session_id: Option<&SessionId>) -> bool {
        session_id
            .and_then(|id| self.sessions.get(id))
            .is_some_and(|s| s.privileged)
    }

    fn send_to(&self, session_id: &SessionId, frame: &ServerMessage) {
        let Some(session) = self.sessions.get(session_id) else {
            debug!("no session registered with id: {session_id}");
            return;
        };
        match serde_json::to_string(frame) {
            Ok(json) => {
                if session.sender.send(WsMessage::text(json)).is_err() {
                    debug!("failed to send to {session_id}: connection gone");
                }
            }
            Err(e) => warn!("failed to serialize frame: {e}"),
        }
    }

    fn delivery_frame(message: &Message, qos: u8, duplicate: bool) -> ServerMessage {
        ServerMessage::Message {
            topic: message.topic.clone(),
            payload: message.payload.clone(),
            timestamp: message.timestamp,
            message_id: message.message_id.clone(),
            qos,
            duplicate,
        }
    }

    /// Subscribe a session to a pattern.
    ///
    /// The pattern must be covered by the allow-list unless the session is
    /// privileged. Returns the granted QoS: the requested tier capped at
    /// the server ceiling. Retained messages matching the pattern are
    /// replayed immediately, outside normal delivery tracking.
    pub fn subscribe(
        &mut self,
        session_id: &SessionId,
        pattern: &str,
        requested_qos: u8,
    ) -> Result<u8, BrokerError> {
        if !self.is_privileged(Some(session_id))
            && !topic::allowed(&self.allowed_prefixes, pattern)
        {
            Stats::incr(&self.stats.routing_rejected);
            return Err(BrokerError::RoutingUnauthorized(pattern.to_string()));
        }

        let granted_qos = requested_qos.min(self.max_qos);
        self.subscriptions
            .entry(pattern.to_string())
            .or_insert_with(|| Subscription::new(pattern))
            .subscribe(session_id.clone(), granted_qos);

        let replays: Vec<Message> = self
            .retained
            .values()
            .filter(|msg| topic::matches(pattern, &msg.topic))
            .cloned()
            .collect();
        for msg in replays {
            self.send_to(session_id, &Self::delivery_frame(&msg, 0, false));
        }

        Ok(granted_qos)
    }

    /// Unsubscribes a session from a pattern
    /// If the pattern does not exist, it will not perform any action
    pub fn unsubscribe(&mut self, session_id: &SessionId, pattern: &str) {
        if let Some(subscription) = self.subscriptions.get_mut(pattern) {
            subscription.unsubscribe(session_id);
        }
    }

    /// Accept a publish.
    ///
    /// The topic must be covered by the allow-list unless the publisher is
    /// privileged; a rejected publish is counted and delivered to no one.
    /// QoS 0/1 publishes route immediately. A QoS 2 publish is held until
    /// the publisher's `pubrel` so replayed publishes with the same message
    /// id route at most once; the broker answers with `pubrec`.
    pub fn publish(
        &mut self,
        publisher_id: Option<&SessionId>,
        mut msg: Message,
    ) -> Result<(), BrokerError> {
        if !self.is_privileged(publisher_id)
            && !topic::allowed(&self.allowed_prefixes, &msg.topic)
        {
            Stats::incr(&self.stats.routing_rejected);
            return Err(BrokerError::RoutingUnauthorized(msg.topic.clone()));
        }

        msg.timestamp = chrono::Utc::now().timestamp_millis();
        if msg.message_id.is_empty() {
            msg.message_id = Uuid::new_v4().to_string();
        }
        self.stats.count_broker_received(msg.qos);

        if msg.qos == 2 {
            let frame = ServerMessage::PubRec {
                message_id: msg.message_id.clone(),
            };
            let owner = publisher_id.cloned().unwrap_or_default();
            // A retransmitted qos 2 publish replaces the held copy instead
            // of routing a second time.
            self.inbound_qos2.insert(msg.message_id.clone(), (owner, msg));
            if let Some(publisher_id) = publisher_id {
                self.send_to(publisher_id, &frame);
            }
            return Ok(());
        }

        self.route(msg);
        Ok(())
    }

    /// Publisher released a held QoS 2 message: route it exactly once and
    /// complete the handshake. Only the session that published the message
    /// can release it; any other session's `pubrel` behaves like a
    /// duplicate, which finds nothing held and still answers `pubcomp`.
    pub fn handle_pubrel(&mut self, publisher_id: &SessionId, message_id: &str) {
        let owned = self
            .inbound_qos2
            .get(message_id)
            .is_some_and(|(owner, _)| owner == publisher_id);
        if owned {
            if let Some((_, msg)) = self.inbound_qos2.remove(message_id) {
                self.route(msg);
            }
        }
        self.send_to(
            publisher_id,
            &ServerMessage::PubComp {
                message_id: message_id.to_string(),
            },
        );
    }

    /// Deliver a message to every current subscriber whose pattern matches,
    /// independently per recipient.
    fn route(&mut self, msg: Message) {
        if msg.retain {
            self.retained.insert(msg.topic.clone(), msg.clone());
        }

        // A session subscribed through several matching patterns gets one
        // delivery at the highest granted QoS.
        let mut recipients: HashMap<SessionId, u8> = HashMap::new();
        for subscription in self.subscriptions.values() {
            if topic::matches(&subscription.pattern, &msg.topic) {
                for (session_id, granted_qos) in &subscription.subscribers {
                    let entry = recipients.entry(session_id.clone()).or_insert(0);
                    *entry = (*entry).max(*granted_qos);
                }
            }
        }

        if recipients.is_empty() {
            debug!("no subscriber matches topic '{}'", msg.topic);
            return;
        }

        let now = chrono::Utc::now().timestamp_millis();
        for (session_id, granted_qos) in recipients {
            let effective_qos = msg.qos.min(granted_qos);
            self.send_to(
                &session_id,
                &Self::delivery_frame(&msg, effective_qos, false),
            );
            Stats::incr(&self.stats.broker_delivered);

            if effective_qos >= 1 {
                let stage = if effective_qos == 1 {
                    DeliveryStage::AwaitingAck
                } else {
                    DeliveryStage::AwaitingRec
                };
                self.pending.insert(
                    (msg.message_id.clone(), session_id),
                    DeliveryRecord {
                        message: msg.clone(),
                        stage,
                        sent_at: now,
                        retries: 0,
                    },
                );
            }
        }
    }

    /// Recipient acknowledged a QoS 1 delivery.
    pub fn handle_ack(&mut self, session_id: &SessionId, message_id: &str) {
        let key = (message_id.to_string(), session_id.clone());
        if self.pending.remove(&key).is_some() {
            debug!("ack received from {session_id} for message {message_id}");
        } else {
            warn!("ack from {session_id} for unknown message {message_id}");
        }
    }

    /// Recipient confirmed receipt of a QoS 2 delivery: advance the record
    /// to the completion stage and release it with `pubrel`.
    pub fn handle_pubrec(&mut self, session_id: &SessionId, message_id: &str) {
        let key = (message_id.to_string(), session_id.clone());
        let Some(record) = self.pending.get_mut(&key) else {
            warn!("pubrec from {session_id} for unknown message {message_id}");
            return;
        };
        record.stage = DeliveryStage::AwaitingComp;
        record.sent_at = chrono::Utc::now().timestamp_millis();
        record.retries = 0;
        self.send_to(
            session_id,
            &ServerMessage::PubRel {
                message_id: message_id.to_string(),
            },
        );
    }

    /// Recipient completed a QoS 2 delivery.
    pub fn handle_pubcomp(&mut self, session_id: &SessionId, message_id: &str) {
        let key = (message_id.to_string(), session_id.clone());
        if self.pending.remove(&key).is_none() {
            warn!("pubcomp from {session_id} for unknown message {message_id}");
        }
    }

    /// Release everything owned by a session: its registration, every
    /// subscription, every pending delivery record, and every QoS 2 publish
    /// held for its `pubrel`, in one call so no later publish can route to
    /// the dead session. Session ids are per-connection, so a held publish
    /// whose publisher is gone can never be legitimately released.
    pub fn cleanup_session(&mut self, session_id: &SessionId) {
        self.sessions.remove(session_id);
        for subscription in self.subscriptions.values_mut() {
            subscription.unsubscribe(session_id);
        }
        self.pending.retain(|(_, recipient), _| recipient != session_id);
        self.inbound_qos2.retain(|_, (owner, _)| owner != session_id);
        info!("cleaned up session {session_id}");
    }

    /// Periodically re-send expired QoS 1/2 frames and drop records whose
    /// retry budget is spent. Run as a background task.
    pub async fn start_retry_loop(broker: Arc<Mutex<Broker>>) {
        loop {
            tokio::time::sleep(tokio::time::Duration::from_millis(500)).await;

            let mut broker_lock = broker.lock().unwrap();
            broker_lock.retry_expired();
        }
    }

    /// One scan of the pending table. Factored out of the loop so tests can
    /// drive it directly.
    pub fn retry_expired(&mut self) {
        let current_time = chrono::Utc::now().timestamp_millis();
        let mut to_resend = Vec::new();
        let mut to_drop = Vec::new();

        for (key, record) in &self.pending {
            if current_time - record.sent_at > self.ack_timeout_ms {
                if record.retries >= self.max_retries {
                    to_drop.push(key.clone());
                } else {
                    to_resend.push(key.clone());
                }
            }
        }

        for key in to_drop {
            if self.pending.remove(&key).is_some() {
                Stats::incr(&self.stats.delivery_exhausted);
                warn!(
                    "delivery of message {} to {} dropped after {} retries",
                    key.0, key.1, self.max_retries
                );
            }
        }

        for (message_id, session_id) in to_resend {
            let key = (message_id.clone(), session_id.clone());
            let Some(record) = self.pending.get_mut(&key) else {
                continue;
            };
            record.sent_at = current_time;
            record.retries += 1;
            let retries = record.retries;

            let frame = match record.stage {
                // Re-send the message itself, marked as a duplicate.
                DeliveryStage::AwaitingAck | DeliveryStage::AwaitingRec => {
                    let qos = if record.stage == DeliveryStage::AwaitingAck {
                        1
                    } else {
                        2
                    };
                    Self::delivery_frame(&record.message, qos, true)
                }
                // The recipient saw the message; re-send the release.
                DeliveryStage::AwaitingComp => ServerMessage::PubRel {
                    message_id: message_id.clone(),
                },
            };
            debug!(
                "re-sending message {message_id} to {session_id}, retry {retries}"
            );
            self.send_to(&session_id, &frame);
        }
    }
}
