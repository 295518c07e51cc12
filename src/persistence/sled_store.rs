use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use sled::Db;

use crate::ingest::reading::Reading;
use crate::persistence::HistoryStore;
use crate::utils::error::StorageError;

/// Sled-backed history store, one tree per channel.
///
/// Keys are the reading's millisecond timestamp (big-endian) followed by a
/// process-wide sequence number, so iteration order is oldest-to-newest and
/// two readings stamped in the same millisecond never collide.
pub struct SledHistory {
    db: Db,
    ttl_seconds: Option<i64>,
    seq: AtomicU64,
}

const KEY_LEN: usize = 16;

fn key_for(timestamp_ms: i64, seq: u64) -> [u8; KEY_LEN] {
    let mut key = [0u8; KEY_LEN];
    key[..8].copy_from_slice(&(timestamp_ms as u64).to_be_bytes());
    key[8..].copy_from_slice(&seq.to_be_bytes());
    key
}

impl SledHistory {
    pub fn open(path: &str, ttl_seconds: Option<i64>) -> Result<Self, StorageError> {
        let db = sled::open(path)?;
        Ok(Self {
            db,
            ttl_seconds,
            seq: AtomicU64::new(1),
        })
    }

    fn decode(value: &[u8]) -> Option<Reading> {
        serde_json::from_slice(value).ok()
    }

    fn cleanup_old_readings(&self, channel_id: &str) -> Result<(), StorageError> {
        if let Some(ttl) = self.ttl_seconds {
            let expiry_ms = (Utc::now().timestamp() - ttl) * 1000;
            let tree = self.db.open_tree(channel_id)?;
            let old_keys: Vec<_> = tree
                .iter()
                .filter_map(|res| res.ok())
                .filter_map(|(key, _)| {
                    if key.len() == KEY_LEN {
                        let ts = u64::from_be_bytes(key[..8].try_into().unwrap()) as i64;
                        if ts < expiry_ms { Some(key) } else { None }
                    } else {
                        None
                    }
                })
                .collect();
            for key in old_keys {
                let _ = tree.remove(key);
            }
        }
        Ok(())
    }
}

impl HistoryStore for SledHistory {
    fn append(&self, channel_id: &str, mut reading: Reading) -> Result<Reading, StorageError> {
        let seq = self.seq.fetch_add(1, Ordering::SeqCst);
        reading.id = seq;

        let serialized = serde_json::to_vec(&reading)?;
        let tree = self.db.open_tree(channel_id)?;
        tree.insert(key_for(reading.timestamp, seq), serialized)?;
        Ok(reading)
    }

    fn latest(&self, channel_id: &str) -> Result<Option<Reading>, StorageError> {
        self.cleanup_old_readings(channel_id)?;
        let tree = self.db.open_tree(channel_id)?;
        Ok(tree.last()?.and_then(|(_, value)| Self::decode(&value)))
    }

    fn range(
        &self,
        channel_id: &str,
        start: Option<i64>,
        end: Option<i64>,
        limit: usize,
    ) -> Result<Vec<Reading>, StorageError> {
        self.cleanup_old_readings(channel_id)?;
        let tree = self.db.open_tree(channel_id)?;

        let lower = key_for(start.unwrap_or(0), 0);
        let upper = key_for(end.unwrap_or(i64::MAX), u64::MAX);

        Ok(tree
            .range(lower..=upper)
            .filter_map(|res| res.ok())
            .filter_map(|(_, value)| Self::decode(&value))
            .take(limit)
            .collect())
    }
}

impl std::fmt::Debug for SledHistory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SledHistory")
            .field("db", &"sled::Db")
            .field("ttl_seconds", &self.ttl_seconds)
            .finish()
    }
}
