//! The `persistence` module provides the append-and-query reading history
//! store.
//!
//! Each channel's history is an append-only stream; readings are never
//! updated or deleted individually. The store is treated as durable and
//! synchronous by callers: a failed append aborts the ingestion that
//! triggered it, and no retry happens here.
//!
//! Currently backed by `sled` as an embedded key-value store, one tree per
//! channel.

pub mod sled_store;

pub use sled_store::SledHistory;

use crate::ingest::reading::Reading;
use crate::utils::error::StorageError;

/// Append-and-query access to a channel's reading history.
pub trait HistoryStore: Send + Sync {
    /// Append a reading and return it with its store-assigned id.
    fn append(&self, channel_id: &str, reading: Reading) -> Result<Reading, StorageError>;

    /// The most recently appended reading for a channel, if any.
    fn latest(&self, channel_id: &str) -> Result<Option<Reading>, StorageError>;

    /// Readings with timestamps in `[start, end]`, oldest to newest,
    /// capped at `limit`. Missing bounds are open.
    fn range(
        &self,
        channel_id: &str,
        start: Option<i64>,
        end: Option<i64>,
        limit: usize,
    ) -> Result<Vec<Reading>, StorageError>;
}

#[cfg(test)]
mod tests;
