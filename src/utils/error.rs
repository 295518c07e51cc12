//! The `error` module defines the error taxonomy used within the `airwave`
//! application.
//!
//! Errors here map one-to-one onto the rejections a direct-transport caller
//! can observe. Publish/subscribe ingestion has no response path, so the
//! same conditions there are only counted, never returned.

use thiserror::Error;

/// Failure to store or load readings through the history store.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage backend error: {0}")]
    Backend(#[from] sled::Error),

    #[error("failed to encode reading: {0}")]
    Encode(#[from] serde_json::Error),
}

/// A rejected ingestion attempt.
///
/// Variants carry the machine-readable reason string used on the wire.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("unknown channel")]
    NotFound,

    #[error("invalid write credential")]
    Unauthorized,

    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("storage failure: {0}")]
    Storage(#[from] StorageError),
}

impl IngestError {
    /// Wire-level reason tag, stable across releases.
    pub fn reason(&self) -> &'static str {
        match self {
            IngestError::NotFound => "not_found",
            IngestError::Unauthorized => "unauthorized",
            IngestError::InvalidPayload(_) => "invalid_payload",
            IngestError::Storage(_) => "storage_failure",
        }
    }
}

/// A rejected broker operation.
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("topic '{0}' is not covered by any allowed prefix")]
    RoutingUnauthorized(String),
}
