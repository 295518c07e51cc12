//! The `stats` module holds process-wide informational counters.
//!
//! Counters are plain atomics bumped from the hot paths and snapshotted on
//! demand for the read-only `stats` wire message. Nothing in the core reads
//! them back to make decisions.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Process-wide counters. One instance lives for the process lifetime and
/// is injected wherever it is needed.
#[derive(Debug, Default)]
pub struct Stats {
    pub sessions_connected: AtomicU64,
    pub rooms: AtomicU64,
    pub broker_received_qos0: AtomicU64,
    pub broker_received_qos1: AtomicU64,
    pub broker_received_qos2: AtomicU64,
    pub broker_delivered: AtomicU64,
    pub routing_rejected: AtomicU64,
    pub delivery_exhausted: AtomicU64,
    pub readings_ingested: AtomicU64,
    pub ingest_not_found: AtomicU64,
    pub ingest_unauthorized: AtomicU64,
    pub ingest_invalid_payload: AtomicU64,
    pub ingest_storage_failure: AtomicU64,
    pub ingest_duplicates_skipped: AtomicU64,
    pub malformed_topics: AtomicU64,
}

/// Point-in-time copy of every counter, in wire shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub sessions_connected: u64,
    pub rooms: u64,
    pub broker_received_qos0: u64,
    pub broker_received_qos1: u64,
    pub broker_received_qos2: u64,
    pub broker_delivered: u64,
    pub routing_rejected: u64,
    pub delivery_exhausted: u64,
    pub readings_ingested: u64,
    pub ingest_not_found: u64,
    pub ingest_unauthorized: u64,
    pub ingest_invalid_payload: u64,
    pub ingest_storage_failure: u64,
    pub ingest_duplicates_skipped: u64,
    pub malformed_topics: u64,
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn decr(counter: &AtomicU64) {
        counter.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn count_broker_received(&self, qos: u8) {
        match qos {
            0 => Self::incr(&self.broker_received_qos0),
            1 => Self::incr(&self.broker_received_qos1),
            _ => Self::incr(&self.broker_received_qos2),
        }
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let get = |c: &AtomicU64| c.load(Ordering::Relaxed);
        StatsSnapshot {
            sessions_connected: get(&self.sessions_connected),
            rooms: get(&self.rooms),
            broker_received_qos0: get(&self.broker_received_qos0),
            broker_received_qos1: get(&self.broker_received_qos1),
            broker_received_qos2: get(&self.broker_received_qos2),
            broker_delivered: get(&self.broker_delivered),
            routing_rejected: get(&self.routing_rejected),
            delivery_exhausted: get(&self.delivery_exhausted),
            readings_ingested: get(&self.readings_ingested),
            ingest_not_found: get(&self.ingest_not_found),
            ingest_unauthorized: get(&self.ingest_unauthorized),
            ingest_invalid_payload: get(&self.ingest_invalid_payload),
            ingest_storage_failure: get(&self.ingest_storage_failure),
            ingest_duplicates_skipped: get(&self.ingest_duplicates_skipped),
            malformed_topics: get(&self.malformed_topics),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Stats;

    #[test]
    fn test_snapshot_reflects_counters() {
        let stats = Stats::new();
        Stats::incr(&stats.readings_ingested);
        Stats::incr(&stats.readings_ingested);
        stats.count_broker_received(1);

        let snap = stats.snapshot();
        assert_eq!(snap.readings_ingested, 2);
        assert_eq!(snap.broker_received_qos1, 1);
        assert_eq!(snap.broker_received_qos0, 0);
    }
}
