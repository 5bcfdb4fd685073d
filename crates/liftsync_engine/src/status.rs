//! Pending/failed counts for presentation layers.

use crate::error::SyncResult;
use liftsync_queue::{QueueStore, RecordStatus, SyncRecord};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;

/// Snapshot of the queue as seen by the UI.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncStatus {
    /// Records waiting to be applied (`Pending` or `InFlight`).
    pub pending: usize,
    /// Records that gave up and need a retry or discard.
    pub failed: usize,
}

impl SyncStatus {
    /// Returns true if nothing is queued.
    pub fn is_idle(&self) -> bool {
        self.pending == 0 && self.failed == 0
    }
}

/// Counts records by status.
pub fn summarize(records: &[SyncRecord]) -> SyncStatus {
    records
        .iter()
        .fold(SyncStatus::default(), |mut status, record| {
            match record.status {
                RecordStatus::Pending | RecordStatus::InFlight => status.pending += 1,
                RecordStatus::Failed => status.failed += 1,
            }
            status
        })
}

/// Derives [`SyncStatus`] from the queue and publishes changes.
///
/// Counts are recomputed from a full scan on every call; queues stay small
/// enough that a cache is not worth the invalidation.
pub struct StatusAggregator<S: QueueStore> {
    store: Arc<S>,
    sender: watch::Sender<SyncStatus>,
}

impl<S: QueueStore> StatusAggregator<S> {
    /// Creates an aggregator over `store`. Subscribers see zero counts until
    /// the first [`refresh`](Self::refresh).
    pub fn new(store: Arc<S>) -> Self {
        let (sender, _) = watch::channel(SyncStatus::default());
        Self { store, sender }
    }

    /// Scans the queue and returns the current counts.
    pub async fn get_status(&self) -> SyncResult<SyncStatus> {
        let records = self.store.list().await?;
        Ok(summarize(&records))
    }

    /// Scans the queue and publishes the counts to subscribers if they changed.
    pub async fn refresh(&self) -> SyncResult<SyncStatus> {
        let status = self.get_status().await?;
        self.publish(status);
        Ok(status)
    }

    /// Publishes an already computed status.
    pub fn publish(&self, status: SyncStatus) {
        self.sender.send_if_modified(|current| {
            if *current == status {
                false
            } else {
                *current = status;
                true
            }
        });
    }

    /// Returns the last published status without touching the queue.
    pub fn latest(&self) -> SyncStatus {
        *self.sender.borrow()
    }

    /// Returns a receiver that observes every published change.
    pub fn subscribe(&self) -> watch::Receiver<SyncStatus> {
        self.sender.subscribe()
    }
}


