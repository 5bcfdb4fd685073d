//! Queue repair commands.
//!
//! These are the only writers besides the sync engine. The queue file lock
//! keeps them from running against a live client.

use super::open_queue;
use liftsync_queue::{discard_failed, recover_in_flight, requeue_failed, RecordId};
use std::path::Path;
use tracing::info;

/// Moves every failed record back to pending.
pub async fn requeue(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    info!("Requeuing failed records in {:?}", path);
    let store = open_queue(path)?;
    let count = requeue_failed(&store).await?;
    println!("Requeued {count} failed record(s)");
    Ok(())
}

/// Moves records left in flight back to pending.
pub async fn recover(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    info!("Recovering interrupted records in {:?}", path);
    let store = open_queue(path)?;
    let count = recover_in_flight(&store).await?;
    println!("Recovered {count} interrupted record(s)");
    Ok(())
}

/// Removes one failed record.
pub async fn discard(path: &Path, id: &str) -> Result<(), Box<dyn std::error::Error>> {
    info!("Discarding record {} from {:?}", id, path);
    let store = open_queue(path)?;
    if discard_failed(&store, &RecordId::from(id)).await? {
        println!("Discarded {id}");
        Ok(())
    } else {
        Err(format!("No failed record with id {id}").into())
    }
}


