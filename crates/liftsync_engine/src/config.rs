//! Configuration for the sync engine.

use crate::error::{SyncError, SyncResult};
use std::time::Duration;

/// Default number of automatic attempts before a record is marked failed.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default interval between periodic sync checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Default timeout for a single remote call.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for sync operations.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Automatic attempts per record (since its last manual retry) before it
    /// is marked failed.
    pub max_attempts: u32,
    /// Interval of the periodic trigger. Doubles as the effective retry
    /// backoff for transient failures.
    pub poll_interval: Duration,
    /// Timeout for a single remote call.
    pub request_timeout: Duration,
}

impl SyncConfig {
    /// Creates a configuration with the default values.
    pub fn new() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            poll_interval: DEFAULT_POLL_INTERVAL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Sets the attempt ceiling.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Sets the periodic trigger interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the remote call timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Checks that the configuration can drive the engine.
    pub fn validate(&self) -> SyncResult<()> {
        if self.max_attempts == 0 {
            return Err(SyncError::Config("max_attempts must be at least 1".into()));
        }
        if self.poll_interval.is_zero() {
            return Err(SyncError::Config("poll_interval must be non-zero".into()));
        }
        if self.request_timeout.is_zero() {
            return Err(SyncError::Config("request_timeout must be non-zero".into()));
        }
        Ok(())
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new()
    }
}


