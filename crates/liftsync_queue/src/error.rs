//! Error types for queue operations.

use crate::record::RecordId;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for queue operations.
pub type QueueResult<T> = Result<T, QueueError>;

/// Errors that can occur while reading or writing the queue.
#[derive(Debug, Error)]
pub enum QueueError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The record list could not be encoded.
    #[error("failed to encode queue: {0}")]
    Encode(String),

    /// The queue file could not be decoded.
    #[error("failed to decode queue: {0}")]
    Decode(String),

    /// The queue file is not a queue file, or has an unknown format.
    #[error("queue corrupted: {0}")]
    Corrupted(String),

    /// A record with this id is already queued.
    #[error("record {0} is already queued")]
    DuplicateId(RecordId),

    /// Another process holds the queue lock.
    #[error("queue at {0:?} is locked by another process")]
    Locked(PathBuf),
}

impl QueueError {
    /// Creates an I/O error with a custom message.
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io(io::Error::other(message.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = QueueError::DuplicateId(RecordId::from("rec-1"));
        assert_eq!(err.to_string(), "record rec-1 is already queued");

        let err = QueueError::io("disk full");
        assert!(err.to_string().contains("disk full"));
    }
}
