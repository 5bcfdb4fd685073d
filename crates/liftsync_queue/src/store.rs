//! Queue store trait definition.

use crate::error::QueueResult;
use crate::record::{RecordId, RecordPatch, SyncRecord};
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Durable, ordered storage for pending mutation records.
///
/// The UI layer only ever calls [`append`](QueueStore::append); the sync
/// engine is the sole caller of `update` and `remove`.
///
/// # Invariants
///
/// - No two records share an id
/// - `list` returns records ordered by `created_at`, append order on ties
/// - Each operation is atomic with respect to itself
/// - A failed write leaves the previously stored state intact
///
/// # Implementors
///
/// - [`super::InMemoryQueueStore`] - For testing
/// - [`super::FileQueueStore`] - For persistent storage
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Adds a record to the queue.
    ///
    /// # Errors
    ///
    /// Returns an error if the id is already queued or the write fails.
    async fn append(&self, record: SyncRecord) -> QueueResult<()>;

    /// Returns all records ordered by `created_at`, ascending.
    ///
    /// The result is an owned snapshot; re-list after mutating the queue.
    async fn list(&self) -> QueueResult<Vec<SyncRecord>>;

    /// Applies a partial update to a record.
    ///
    /// Does nothing if the record has already been removed.
    async fn update(&self, id: &RecordId, patch: RecordPatch) -> QueueResult<()>;

    /// Removes a record. Removing an absent id is not an error.
    async fn remove(&self, id: &RecordId) -> QueueResult<()>;

    /// Returns true if a record with this id is queued.
    async fn contains(&self, id: &RecordId) -> QueueResult<bool> {
        Ok(self.list().await?.iter().any(|record| &record.id == id))
    }

    /// Records that the placeholder `local_id` is known remotely as
    /// `server_id`. Recording the same pair again is a no-op.
    ///
    /// Mappings outlive the records that produced them: the client may keep
    /// queuing mutations against a placeholder id long after its create was
    /// applied.
    async fn record_remap(&self, local_id: &str, server_id: &str) -> QueueResult<()>;

    /// Returns every recorded placeholder → server id mapping.
    async fn remaps(&self) -> QueueResult<BTreeMap<String, String>>;
}

/// Sorts records by creation time, keeping append order on ties.
pub(crate) fn ordered(mut records: Vec<SyncRecord>) -> Vec<SyncRecord> {
    records.sort_by_key(|record| record.created_at);
    records
}
