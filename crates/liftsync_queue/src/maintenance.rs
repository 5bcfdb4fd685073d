//! Bulk state repairs that work on any queue store.

use crate::error::QueueResult;
use crate::record::{RecordId, RecordPatch, RecordStatus};
use crate::store::QueueStore;
use tracing::{debug, info};

/// Returns records left `InFlight` by an interrupted process to `Pending`.
///
/// Whether the interrupted remote call landed cannot be known, so the record
/// is simply dispatched again. Returns the number of recovered records.
pub async fn recover_in_flight<S: QueueStore + ?Sized>(store: &S) -> QueueResult<usize> {
    let mut recovered = 0;
    for record in store.list().await? {
        if record.status == RecordStatus::InFlight {
            store
                .update(&record.id, RecordPatch::new().status(RecordStatus::Pending))
                .await?;
            recovered += 1;
        }
    }
    if recovered > 0 {
        info!(recovered, "recovered in-flight sync records");
    }
    Ok(recovered)
}

/// Moves every `Failed` record back to `Pending` with a fresh retry budget.
///
/// `attempts` is left as is; the baseline moves up to it instead. Returns the
/// number of requeued records.
pub async fn requeue_failed<S: QueueStore + ?Sized>(store: &S) -> QueueResult<usize> {
    let mut requeued = 0;
    for record in store.list().await? {
        if record.status == RecordStatus::Failed {
            let patch = RecordPatch::new()
                .status(RecordStatus::Pending)
                .clear_error()
                .retry_baseline(record.attempts);
            store.update(&record.id, patch).await?;
            requeued += 1;
        }
    }
    if requeued > 0 {
        info!(requeued, "requeued failed sync records");
    }
    Ok(requeued)
}

/// Removes a record the user gave up on.
///
/// Only `Failed` records can be discarded; pending work is never dropped this
/// way. Returns true if a record was removed.
pub async fn discard_failed<S: QueueStore + ?Sized>(store: &S, id: &RecordId) -> QueueResult<bool> {
    let records = store.list().await?;
    let Some(record) = records.iter().find(|record| &record.id == id) else {
        return Ok(false);
    };
    if record.status != RecordStatus::Failed {
        debug!(record_id = %id, status = %record.status, "refusing to discard unfailed record");
        return Ok(false);
    }
    store.remove(id).await?;
    info!(
        record_id = %id,
        entity_type = %record.entity_type,
        entity_id = %record.entity_id,
        "discarded failed sync record"
    );
    Ok(true)
}


