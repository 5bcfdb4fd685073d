//! Conflict policy for updates.

use crate::error::{DispatchFailure, RemoteError};
use crate::remote::RemoteStore;
use async_trait::async_trait;
use liftsync_queue::SyncRecord;
use tracing::debug;

/// Decides how a queued `Update` is applied when the remote entity may have
/// changed since the mutation was recorded.
#[async_trait]
pub trait ConflictResolver: Send + Sync {
    /// Applies `record` (an `Update`) to the remote store.
    async fn resolve_update(
        &self,
        remote: &dyn RemoteStore,
        record: &SyncRecord,
    ) -> Result<(), DispatchFailure>;
}

/// Last write wins, by local queue time.
///
/// The local payload is sent as-is; there is no read-and-merge step and no
/// field-level merging. Concurrent writes from other devices are settled by
/// the remote store's own last-write-wins. An update whose target no longer
/// exists remotely fails permanently; it is never turned into a create.
#[derive(Debug, Default, Clone, Copy)]
pub struct LastWriteWins;

impl LastWriteWins {
    /// Creates the resolver.
    pub fn new() -> Self {
        Self
    }
}

/// Message recorded when an update targets a vanished entity.
pub fn vanished_message(entity_type: &str, entity_id: &str) -> String {
    format!("{entity_type} {entity_id} no longer exists on the remote store; update not applied")
}

#[async_trait]
impl ConflictResolver for LastWriteWins {
    async fn resolve_update(
        &self,
        remote: &dyn RemoteStore,
        record: &SyncRecord,
    ) -> Result<(), DispatchFailure> {
        match remote
            .update(&record.entity_type, &record.entity_id, &record.payload)
            .await
        {
            Ok(()) => Ok(()),
            Err(RemoteError::NotFound) => {
                debug!(
                    record_id = %record.id,
                    entity_type = %record.entity_type,
                    entity_id = %record.entity_id,
                    "update target vanished remotely"
                );
                Err(DispatchFailure::permanent(vanished_message(
                    &record.entity_type,
                    &record.entity_id,
                )))
            }
            Err(err) => Err(err.into()),
        }
    }
}


