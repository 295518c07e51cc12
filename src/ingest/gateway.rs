use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};

use crate::aqi::compute_aqi;
use crate::directory::ChannelDirectory;
use crate::fanout::FanoutRouter;
use crate::ingest::reading::{Reading, ReadingInput};
use crate::persistence::HistoryStore;
use crate::stats::Stats;
use crate::utils::error::IngestError;

/// Bounded memory of broker message ids already persisted, so duplicate
/// redeliveries under QoS 1/2 retry never create a second stored reading.
#[derive(Debug, Default)]
struct SeenWindow {
    ids: HashSet<String>,
    order: VecDeque<String>,
}

impl SeenWindow {
    const CAPACITY: usize = 1024;

    fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    fn remember(&mut self, id: &str) {
        if self.ids.insert(id.to_string()) {
            self.order.push_back(id.to_string());
            if self.order.len() > Self::CAPACITY {
                if let Some(evicted) = self.order.pop_front() {
                    self.ids.remove(&evicted);
                }
            }
        }
    }
}

/// Validates, scores, persists, and fans out readings.
///
/// Ingestion success never depends on anyone watching: the fanout handoff
/// is best-effort and an empty room is the common case. A failed append
/// aborts the call and nothing is emitted for that reading.
pub struct IngestGateway {
    directory: Arc<dyn ChannelDirectory>,
    store: Arc<dyn HistoryStore>,
    fanout: Arc<FanoutRouter>,
    stats: Arc<Stats>,
    seen: Mutex<SeenWindow>,
}

impl IngestGateway {
    pub fn new(
        directory: Arc<dyn ChannelDirectory>,
        store: Arc<dyn HistoryStore>,
        fanout: Arc<FanoutRouter>,
        stats: Arc<Stats>,
    ) -> Self {
        Self {
            directory,
            store,
            fanout,
            stats,
            seen: Mutex::new(SeenWindow::default()),
        }
    }

    fn count_error(&self, err: &IngestError) {
        let counter = match err {
            IngestError::NotFound => &self.stats.ingest_not_found,
            IngestError::Unauthorized => &self.stats.ingest_unauthorized,
            IngestError::InvalidPayload(_) => &self.stats.ingest_invalid_payload,
            IngestError::Storage(_) => &self.stats.ingest_storage_failure,
        };
        Stats::incr(counter);
    }

    /// Direct-path ingestion: the caller gets the enriched reading back or
    /// a typed rejection it can retry or report.
    pub fn ingest(
        &self,
        channel_id: &str,
        credential: &str,
        input: &ReadingInput,
    ) -> Result<Reading, IngestError> {
        if !self.directory.exists(channel_id) {
            self.count_error(&IngestError::NotFound);
            return Err(IngestError::NotFound);
        }
        if !self.directory.validate_write_credential(channel_id, credential) {
            self.count_error(&IngestError::Unauthorized);
            return Err(IngestError::Unauthorized);
        }
        self.persist_and_emit(channel_id, input)
            .inspect_err(|e| self.count_error(e))
    }

    /// Broker-path ingestion: channel identity comes from the topic, the
    /// publish was already authorized by the broker's allow-list, and there
    /// is no response path: failures are dropped and counted, duplicates
    /// are skipped by message id.
    pub fn ingest_from_broker(&self, topic: &str, payload: &str, message_id: &str) {
        let Some(channel_id) = parse_reading_topic(topic) else {
            Stats::incr(&self.stats.malformed_topics);
            warn!("dropping publish with malformed reading topic '{topic}'");
            return;
        };

        if self.seen.lock().unwrap().contains(message_id) {
            Stats::incr(&self.stats.ingest_duplicates_skipped);
            debug!("skipping duplicate delivery of message {message_id}");
            return;
        }

        let input: ReadingInput = match serde_json::from_str(payload) {
            Ok(input) => input,
            Err(e) => {
                self.count_error(&IngestError::InvalidPayload(e.to_string()));
                warn!("dropping unreadable reading payload on '{topic}': {e}");
                return;
            }
        };

        if !self.directory.exists(channel_id) {
            self.count_error(&IngestError::NotFound);
            warn!("dropping reading for unknown channel '{channel_id}'");
            return;
        }

        match self.persist_and_emit(channel_id, &input) {
            Ok(reading) => {
                self.seen.lock().unwrap().remember(message_id);
                debug!(
                    "ingested reading {} for channel {channel_id} via broker",
                    reading.id
                );
            }
            Err(e) => {
                self.count_error(&e);
                warn!("dropping reading for channel '{channel_id}': {e}");
            }
        }
    }

    /// The shared tail of both paths: validate fields, stamp the server
    /// time, score, append, then hand off to the fanout router.
    fn persist_and_emit(
        &self,
        channel_id: &str,
        input: &ReadingInput,
    ) -> Result<Reading, IngestError> {
        let concentrations = input.validate()?;
        let result = compute_aqi(&concentrations);
        let timestamp = chrono::Utc::now().timestamp_millis();
        let reading = Reading::enriched(channel_id, input, result, timestamp);

        let reading = self.store.append(channel_id, reading)?;
        Stats::incr(&self.stats.readings_ingested);
        info!(
            "ingested reading {} for channel {channel_id} (aqi {})",
            reading.id, reading.aqi
        );

        self.fanout.emit(channel_id, &reading);
        Ok(reading)
    }
}

/// Extract the channel id from a `sensors/<channelId>/readings` topic.
/// Anything with the wrong segment count or wrong fixed segments is
/// malformed.
pub fn parse_reading_topic(topic: &str) -> Option<&str> {
    let mut segments = topic.split('/');
    match (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) {
        (Some("sensors"), Some(channel_id), Some("readings"), None) if !channel_id.is_empty() => {
            Some(channel_id)
        }
        _ => None,
    }
}
