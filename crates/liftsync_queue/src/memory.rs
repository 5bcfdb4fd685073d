//! In-memory queue store for testing.

use crate::error::{QueueError, QueueResult};
use crate::record::{RecordId, RecordPatch, SyncRecord};
use crate::store::{ordered, QueueStore};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

/// An in-memory queue store.
///
/// Suitable for unit tests, integration tests and sessions that do not need
/// to survive a restart. Records are kept in append order.
///
/// # Fault injection
///
/// [`set_fail_writes`](Self::set_fail_writes) makes every mutating call fail
/// with an I/O error, which is how tests exercise storage faults.
#[derive(Debug, Default)]
pub struct InMemoryQueueStore {
    records: RwLock<Vec<SyncRecord>>,
    remaps: RwLock<BTreeMap<String, String>>,
    fail_writes: AtomicBool,
}

impl InMemoryQueueStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-filled with records, bypassing duplicate checks.
    ///
    /// Useful for testing recovery scenarios.
    #[must_use]
    pub fn with_records(records: Vec<SyncRecord>) -> Self {
        Self {
            records: RwLock::new(records),
            remaps: RwLock::default(),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Returns a copy of all records in append order.
    #[must_use]
    pub fn records(&self) -> Vec<SyncRecord> {
        self.records.read().clone()
    }

    /// Returns the number of queued records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Returns true if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Makes subsequent writes fail (or succeed again).
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> QueueResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(QueueError::io("in-memory queue rejected write"));
        }
        Ok(())
    }
}

#[async_trait]
impl QueueStore for InMemoryQueueStore {
    async fn append(&self, record: SyncRecord) -> QueueResult<()> {
        self.check_writable()?;
        let mut records = self.records.write();
        if records.iter().any(|existing| existing.id == record.id) {
            return Err(QueueError::DuplicateId(record.id));
        }
        records.push(record);
        Ok(())
    }

    async fn list(&self) -> QueueResult<Vec<SyncRecord>> {
        Ok(ordered(self.records.read().clone()))
    }

    async fn update(&self, id: &RecordId, patch: RecordPatch) -> QueueResult<()> {
        self.check_writable()?;
        if let Some(record) = self.records.write().iter_mut().find(|r| &r.id == id) {
            patch.apply(record);
        }
        Ok(())
    }

    async fn remove(&self, id: &RecordId) -> QueueResult<()> {
        self.check_writable()?;
        self.records.write().retain(|record| &record.id != id);
        Ok(())
    }

    async fn record_remap(&self, local_id: &str, server_id: &str) -> QueueResult<()> {
        self.check_writable()?;
        self.remaps
            .write()
            .insert(local_id.to_string(), server_id.to_string());
        Ok(())
    }

    async fn remaps(&self) -> QueueResult<BTreeMap<String, String>> {
        Ok(self.remaps.read().clone())
    }
}


