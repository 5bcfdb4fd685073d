//! Error types for the sync engine.

use liftsync_queue::QueueError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that abort a sync operation.
///
/// Individual record failures never surface here; they are recorded on the
/// record itself. Only faults that make the whole pass unsafe are returned.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The queue store could not be read or written.
    #[error("queue storage error: {0}")]
    Storage(#[from] QueueError),

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Errors reported by the remote store for a single call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// Connectivity loss or temporary unavailability (5xx, rate limiting).
    #[error("remote unavailable: {0}")]
    Unavailable(String),

    /// The call did not complete in time.
    #[error("remote call timed out")]
    Timeout,

    /// The target entity does not exist remotely.
    #[error("entity not found")]
    NotFound,

    /// The remote store refused the payload (validation and the like).
    #[error("rejected by remote: {0}")]
    Rejected(String),
}

impl RemoteError {
    /// Returns true if the call may succeed when retried unchanged.
    pub fn is_transient(&self) -> bool {
        matches!(self, RemoteError::Unavailable(_) | RemoteError::Timeout)
    }

    /// Classifies a non-success HTTP status.
    pub fn from_status(status: u16, body: &str) -> Self {
        let detail = if body.trim().is_empty() {
            format!("HTTP {status}")
        } else {
            format!("HTTP {status}: {}", body.trim())
        };
        match status {
            404 | 410 => RemoteError::NotFound,
            408 | 425 | 429 | 500..=599 => RemoteError::Unavailable(detail),
            _ => RemoteError::Rejected(detail),
        }
    }
}

/// How a record failure is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Retried on a later run until the attempt ceiling.
    Transient,
    /// Marked failed immediately.
    Permanent,
}

/// Why a single record could not be applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchFailure {
    /// Retry classification.
    pub kind: FailureKind,
    /// Human-readable description, stored as the record's `last_error`.
    pub message: String,
}

impl DispatchFailure {
    /// Creates a transient failure.
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Transient,
            message: message.into(),
        }
    }

    /// Creates a permanent failure.
    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Permanent,
            message: message.into(),
        }
    }

    /// Returns true if the record may be retried automatically.
    pub fn is_transient(&self) -> bool {
        self.kind == FailureKind::Transient
    }
}

impl From<RemoteError> for DispatchFailure {
    fn from(err: RemoteError) -> Self {
        if err.is_transient() {
            Self::transient(err.to_string())
        } else {
            Self::permanent(err.to_string())
        }
    }
}


