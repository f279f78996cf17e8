//! Error taxonomy for store operations.
//!
//! A missing key is never an error: reads report it as `None`, and the
//! conditional increment reports it as a no-op.

use thiserror::Error;

/// Error type crossing the collaborator seams (pool, connection).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors surfaced by store operations. None are retried internally.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Checkout or health check of a pooled connection failed.
    #[error("connection acquisition failed: {0}")]
    ConnectionAcquisition(#[source] BoxError),
    /// The store rejected the command or the transport failed mid-command.
    #[error("{command} failed: {source}")]
    Command {
        command: &'static str,
        #[source]
        source: BoxError,
    },
    /// Value could not be encoded; nothing was sent.
    #[error("value encoding failed: {0}")]
    Serialization(#[source] serde_json::Error),
    /// Reply could not be decoded and no string fallback applied.
    #[error("{command} reply decoding failed: {source}")]
    Deserialization {
        command: &'static str,
        #[source]
        source: serde_json::Error,
    },
    /// Reply was present but not of the expected type.
    #[error("{command} replied with {got}, expected {expected}")]
    ReplyShape {
        command: &'static str,
        expected: &'static str,
        got: &'static str,
    },
    /// At least one worker of a batch fetch failed; partial results are dropped.
    #[error("batch fetch failed for {failed} of {total} keys: {source}")]
    BatchPartialFailure {
        failed: usize,
        total: usize,
        #[source]
        source: Box<StoreError>,
    },
}

impl StoreError {
    pub(crate) fn reply_shape(command: &'static str, expected: &'static str, got: &kvdao_client::RespValue) -> Self {
        StoreError::ReplyShape {
            command,
            expected,
            got: got.kind(),
        }
    }
}
