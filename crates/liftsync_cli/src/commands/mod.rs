//! CLI command implementations.

pub mod list;
pub mod repair;
pub mod status;

use liftsync_queue::FileQueueStore;
use std::path::Path;
use tracing::debug;

/// Opens an existing queue file.
///
/// A missing file is reported instead of silently creating an empty queue.
pub fn open_queue(path: &Path) -> Result<FileQueueStore, Box<dyn std::error::Error>> {
    if !path.exists() {
        return Err(format!("No queue found at {}", path.display()).into());
    }
    let store = FileQueueStore::open(path)?;
    debug!("Opened queue {:?} with {} record(s)", path, store.len());
    Ok(store)
}
