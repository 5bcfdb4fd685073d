//! Queue draining.
//!
//! The processor walks the queue in `created_at` order and applies each
//! eligible record to the remote store exactly once per run. A record is
//! eligible when it is `Pending` (or left `InFlight` by a crash), nothing it
//! depends on is still queued, and no earlier record for the same entity is
//! still queued.
//!
//! ```text
//!  Pending ──► InFlight ──► (removed)          success
//!                  │
//!                  ├──────► Pending            transient, below ceiling
//!                  │
//!                  └──────► Failed ──► Pending  retry_failed()
//! ```

use crate::config::SyncConfig;
use crate::error::{DispatchFailure, RemoteError, SyncResult};
use crate::remap::{self, IdRemapTable};
use crate::remote::RemoteStore;
use crate::resolver::{ConflictResolver, LastWriteWins};
use crate::status::{summarize, SyncStatus};
use liftsync_queue::{
    discard_failed, recover_in_flight, requeue_failed, EntityKey, Operation, QueueStore, RecordId,
    RecordPatch, RecordStatus, SyncRecord,
};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Counts reported by a completed run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Records applied remotely and removed during the run.
    pub applied: usize,
    /// Failed records in the queue after the run.
    pub failed: usize,
    /// Pending records in the queue after the run.
    pub still_pending: usize,
}

impl RunSummary {
    /// Returns the queue counts after the run.
    pub fn status(&self) -> SyncStatus {
        SyncStatus {
            pending: self.still_pending,
            failed: self.failed,
        }
    }
}

/// Result of a `run_once` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The queue was drained as far as possible.
    Completed(RunSummary),
    /// Another run was active; this call did nothing.
    AlreadyRunning,
    /// The network signal reported offline; nothing was dispatched.
    Offline(SyncStatus),
}

impl RunOutcome {
    /// Returns the summary of a completed run.
    pub fn summary(&self) -> Option<RunSummary> {
        match self {
            RunOutcome::Completed(summary) => Some(*summary),
            _ => None,
        }
    }
}

/// What happened to a single dispatched record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecordOutcome {
    Applied,
    Retrying,
    Failed,
}

/// Holds the single-flight flag for the duration of a run.
struct RunGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> RunGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Drains the queue against the remote store.
pub struct SyncProcessor<S: QueueStore, R: RemoteStore> {
    store: Arc<S>,
    remote: Arc<R>,
    resolver: Box<dyn ConflictResolver>,
    config: SyncConfig,
    remap: Mutex<IdRemapTable>,
    running: AtomicBool,
}

impl<S: QueueStore, R: RemoteStore> SyncProcessor<S, R> {
    /// Creates a processor using the last-write-wins resolver.
    pub fn new(config: SyncConfig, store: Arc<S>, remote: Arc<R>) -> Self {
        Self {
            store,
            remote,
            resolver: Box::new(LastWriteWins),
            config,
            remap: Mutex::new(IdRemapTable::new()),
            running: AtomicBool::new(false),
        }
    }

    /// Replaces the conflict resolver.
    pub fn with_resolver(mut self, resolver: impl ConflictResolver + 'static) -> Self {
        self.resolver = Box::new(resolver);
        self
    }

    /// Gets the configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Returns true while a run is active.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Returns the server id recorded for a local placeholder id.
    ///
    /// Mappings recorded by an earlier process are visible once
    /// [`recover`](Self::recover) or a run has loaded them from the store.
    pub fn resolve_id(&self, local_id: &str) -> Option<String> {
        self.remap.lock().resolve(local_id).map(str::to_string)
    }

    /// Attempts every eligible record once.
    ///
    /// Returns [`RunOutcome::AlreadyRunning`] without touching the queue if
    /// another run is active. Record failures are recorded on the records;
    /// only storage faults abort the run.
    pub async fn run_once(&self) -> SyncResult<RunOutcome> {
        let Some(_guard) = RunGuard::acquire(&self.running) else {
            debug!("sync run already active");
            return Ok(RunOutcome::AlreadyRunning);
        };
        self.load_remaps().await?;

        let mut attempted: HashSet<RecordId> = HashSet::new();
        let mut applied = 0;
        let mut failed_now = 0;

        // Re-list after every dispatch: a success may unblock later records
        // and rewrites their ids in the store.
        while let Some(record) = self.next_eligible(&attempted).await? {
            attempted.insert(record.id.clone());
            match self.process(record).await? {
                RecordOutcome::Applied => applied += 1,
                RecordOutcome::Failed => failed_now += 1,
                RecordOutcome::Retrying => {}
            }
        }

        let status = summarize(&self.store.list().await?);
        let summary = RunSummary {
            applied,
            failed: status.failed,
            still_pending: status.pending,
        };
        if !attempted.is_empty() {
            info!(
                attempted = attempted.len(),
                applied,
                failed = failed_now,
                still_pending = summary.still_pending,
                "sync run complete"
            );
        }
        Ok(RunOutcome::Completed(summary))
    }

    /// Returns records left `InFlight` by a crash to `Pending` and loads the
    /// placeholder id mappings recorded by earlier processes.
    pub async fn recover(&self) -> SyncResult<usize> {
        self.load_remaps().await?;
        Ok(recover_in_flight(self.store.as_ref()).await?)
    }

    /// Returns every `Failed` record to `Pending` with a fresh retry budget.
    ///
    /// Returns the number of requeued records.
    pub async fn requeue_failed(&self) -> SyncResult<usize> {
        Ok(requeue_failed(self.store.as_ref()).await?)
    }

    /// Removes a `Failed` record.
    ///
    /// Returns false if the record is absent or not failed; pending work is
    /// never dropped this way.
    pub async fn discard(&self, id: &RecordId) -> SyncResult<bool> {
        Ok(discard_failed(self.store.as_ref(), id).await?)
    }

    /// Merges the mappings recorded in the store into the in-memory table.
    async fn load_remaps(&self) -> SyncResult<()> {
        let stored = self.store.remaps().await?;
        let mut table = self.remap.lock();
        for (local_id, server_id) in stored {
            table.insert(local_id, server_id);
        }
        Ok(())
    }

    /// Finds the first record, in queue order, that may be dispatched now.
    async fn next_eligible(&self, attempted: &HashSet<RecordId>) -> SyncResult<Option<SyncRecord>> {
        let records = self.store.list().await?;
        let queued: HashSet<&RecordId> = records.iter().map(|record| &record.id).collect();
        let mut seen: HashSet<EntityKey> = HashSet::new();
        let mut eligible = None;

        for record in &records {
            // Any earlier record for the entity blocks this one, whatever its status.
            let earlier_for_entity = !seen.insert(record.entity_key());
            if eligible.is_some()
                || earlier_for_entity
                || !record.status.is_pending()
                || attempted.contains(&record.id)
            {
                continue;
            }
            if let Some(dependency) = &record.depends_on {
                if queued.contains(dependency) {
                    debug!(record_id = %record.id, depends_on = %dependency, "waiting on dependency");
                    continue;
                }
            }
            eligible = Some(record.id.clone());
        }

        Ok(eligible.and_then(|id| records.into_iter().find(|record| record.id == id)))
    }

    async fn process(&self, mut record: SyncRecord) -> SyncResult<RecordOutcome> {
        record.attempts += 1;
        let mut patch = RecordPatch::new()
            .status(RecordStatus::InFlight)
            .attempts(record.attempts);
        if self.apply_remap(&mut record) {
            patch = patch
                .entity_id(record.entity_id.clone())
                .payload(record.payload.clone());
        }
        self.store.update(&record.id, patch).await?;

        debug!(
            record_id = %record.id,
            entity_type = %record.entity_type,
            entity_id = %record.entity_id,
            operation = %record.operation,
            attempts = record.attempts,
            "dispatching sync record"
        );

        match self.dispatch(&record).await {
            Ok(server_id) => {
                if let Some(server_id) = server_id {
                    self.adopt_server_id(&record, server_id).await?;
                }
                self.store.remove(&record.id).await?;
                debug!(record_id = %record.id, "sync record applied");
                Ok(RecordOutcome::Applied)
            }
            Err(failure) => self.record_failure(&record, failure).await,
        }
    }

    /// Sends the record to the remote. A successful create yields the
    /// server-assigned id.
    async fn dispatch(&self, record: &SyncRecord) -> Result<Option<String>, DispatchFailure> {
        match record.operation {
            Operation::Create => {
                let server_id = self
                    .remote
                    .insert(&record.entity_type, record.id.as_str(), &record.payload)
                    .await?;
                Ok(Some(server_id))
            }
            Operation::Update => {
                self.resolver
                    .resolve_update(self.remote.as_ref(), record)
                    .await?;
                Ok(None)
            }
            Operation::Delete => {
                match self
                    .remote
                    .delete(&record.entity_type, &record.entity_id)
                    .await
                {
                    // Already gone is the desired end state.
                    Ok(()) | Err(RemoteError::NotFound) => Ok(None),
                    Err(err) => Err(err.into()),
                }
            }
        }
    }

    /// Records the local → server mapping and rewrites queued references.
    ///
    /// The mapping is stored durably so records queued after a restart still
    /// resolve. Dependents are rewritten before the create record is removed,
    /// so a crash in between only repeats an idempotent insert.
    async fn adopt_server_id(&self, record: &SyncRecord, server_id: String) -> SyncResult<()> {
        let local_id = record.entity_id.as_str();
        if local_id == server_id {
            return Ok(());
        }
        self.store.record_remap(local_id, &server_id).await?;
        self.remap.lock().insert(local_id, server_id.as_str());
        info!(
            entity_type = %record.entity_type,
            local_id,
            server_id = %server_id,
            "remapped local entity id"
        );

        for mut other in self.store.list().await? {
            if other.id == record.id || !remap::references(&other, local_id) {
                continue;
            }
            if other.entity_id == local_id {
                other.entity_id.clone_from(&server_id);
            }
            remap::replace_in_payload(&mut other.payload, local_id, &server_id);
            let patch = RecordPatch::new()
                .entity_id(other.entity_id)
                .payload(other.payload);
            self.store.update(&other.id, patch).await?;
        }
        Ok(())
    }

    async fn record_failure(
        &self,
        record: &SyncRecord,
        failure: DispatchFailure,
    ) -> SyncResult<RecordOutcome> {
        let attempts = record.attempts_since_retry();
        if failure.is_transient() && attempts < self.config.max_attempts {
            warn!(
                record_id = %record.id,
                entity_type = %record.entity_type,
                entity_id = %record.entity_id,
                attempts = record.attempts,
                error = %failure.message,
                "sync record failed, will retry"
            );
            self.store
                .update(
                    &record.id,
                    RecordPatch::new().status(RecordStatus::Pending).clear_error(),
                )
                .await?;
            return Ok(RecordOutcome::Retrying);
        }

        let message = if failure.is_transient() {
            format!("{} (gave up after {attempts} attempts)", failure.message)
        } else {
            failure.message
        };
        warn!(
            record_id = %record.id,
            entity_type = %record.entity_type,
            entity_id = %record.entity_id,
            attempts = record.attempts,
            error = %message,
            "sync record failed"
        );
        self.store
            .update(
                &record.id,
                RecordPatch::new()
                    .status(RecordStatus::Failed)
                    .last_error(message),
            )
            .await?;
        Ok(RecordOutcome::Failed)
    }

    fn apply_remap(&self, record: &mut SyncRecord) -> bool {
        self.remap.lock().apply(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::{MockRemoteStore, RemoteCall};
    use liftsync_queue::{InMemoryQueueStore, Payload, QueueError};
    use serde_json::json;

    fn payload(value: serde_json::Value) -> Payload {
        value.as_object().cloned().unwrap()
    }

    fn setup() -> (
        Arc<InMemoryQueueStore>,
        Arc<MockRemoteStore>,
        SyncProcessor<InMemoryQueueStore, MockRemoteStore>,
    ) {
        let store = Arc::new(InMemoryQueueStore::new());
        let remote = Arc::new(MockRemoteStore::new());
        let processor =
            SyncProcessor::new(SyncConfig::default(), Arc::clone(&store), Arc::clone(&remote));
        (store, remote, processor)
    }

    #[tokio::test]
    async fn empty_queue_completes() {
        let (_store, remote, processor) = setup();
        let outcome = processor.run_once().await.unwrap();
        assert_eq!(outcome, RunOutcome::Completed(RunSummary::default()));
        assert_eq!(remote.call_count(), 0);
        assert!(!processor.is_running());
    }

    #[tokio::test]
    async fn create_then_dependent_update_in_one_run() {
        let (store, remote, processor) = setup();
        remote.set_next_id(42);

        let create = SyncRecord::create("workout", "local-1", payload(json!({"name": "Legs"})));
        let update = SyncRecord::update("workout", "local-1", payload(json!({"name": "Leg day"})))
            .with_depends_on(create.id.clone());
        store.append(create).await.unwrap();
        store.append(update).await.unwrap();

        let summary = processor.run_once().await.unwrap().summary().unwrap();
        assert_eq!(summary, RunSummary { applied: 2, failed: 0, still_pending: 0 });
        assert!(store.is_empty());
        assert_eq!(processor.resolve_id("local-1").as_deref(), Some("srv-42"));
        assert_eq!(remote.entity("workout", "srv-42").unwrap()["name"], "Leg day");

        let calls = remote.calls();
        assert!(matches!(&calls[1], RemoteCall::Update { entity_id, .. } if entity_id == "srv-42"));
    }

    #[tokio::test]
    async fn payload_references_are_remapped() {
        let (store, remote, processor) = setup();
        remote.set_next_id(7);

        let workout = SyncRecord::create("workout", "local-1", payload(json!({"name": "Push"})));
        let set = SyncRecord::create(
            "workoutSet",
            "local-2",
            payload(json!({"workoutId": "local-1", "reps": 5})),
        )
        .with_depends_on(workout.id.clone());
        store.append(workout).await.unwrap();
        store.append(set).await.unwrap();

        processor.run_once().await.unwrap();
        let stored = remote.entity("workoutSet", "srv-8").unwrap();
        assert_eq!(stored["workoutId"], "srv-7");
    }

    #[tokio::test]
    async fn dependent_waits_while_dependency_fails() {
        let (store, remote, processor) = setup();
        remote.fail_next_insert("workout", RemoteError::Timeout);

        let create = SyncRecord::create("workout", "local-1", Payload::new());
        let set = SyncRecord::create("workoutSet", "local-2", payload(json!({"workoutId": "local-1"})))
            .with_depends_on(create.id.clone());
        store.append(create).await.unwrap();
        store.append(set).await.unwrap();

        let summary = processor.run_once().await.unwrap().summary().unwrap();
        assert_eq!(summary, RunSummary { applied: 0, failed: 0, still_pending: 2 });
        assert_eq!(remote.call_count(), 1);

        let summary = processor.run_once().await.unwrap().summary().unwrap();
        assert_eq!(summary.applied, 2);
        assert_eq!(
            remote.entity("workoutSet", "srv-2").unwrap()["workoutId"],
            "srv-1"
        );
    }

    #[tokio::test]
    async fn delete_of_absent_entity_succeeds() {
        let (store, remote, processor) = setup();
        store.append(SyncRecord::delete("workout", "srv-9")).await.unwrap();

        let summary = processor.run_once().await.unwrap().summary().unwrap();
        assert_eq!(summary.applied, 1);
        assert!(store.is_empty());
        assert_eq!(remote.call_count(), 1);
    }

    #[tokio::test]
    async fn update_of_absent_entity_fails_permanently() {
        let (store, remote, processor) = setup();
        store
            .append(SyncRecord::update("workout", "srv-9", payload(json!({"name": "Push"}))))
            .await
            .unwrap();

        let summary = processor.run_once().await.unwrap().summary().unwrap();
        assert_eq!(summary, RunSummary { applied: 0, failed: 1, still_pending: 0 });

        let records = store.records();
        let record = &records[0];
        assert_eq!(record.status, RecordStatus::Failed);
        assert!(record.last_error.as_deref().unwrap().contains("no longer exists"));

        // Failed records are not retried automatically.
        processor.run_once().await.unwrap();
        assert_eq!(remote.call_count(), 1);
        assert_eq!(remote.entity_count(), 0);
    }

    #[tokio::test]
    async fn transient_failure_returns_to_pending() {
        let (store, remote, processor) = setup();
        remote.seed("workout", "srv-1", Payload::new());
        remote.fail_next("srv-1", RemoteError::Unavailable("HTTP 503".into()));
        store
            .append(SyncRecord::update("workout", "srv-1", Payload::new()))
            .await
            .unwrap();

        let summary = processor.run_once().await.unwrap().summary().unwrap();
        assert_eq!(summary.still_pending, 1);
        let records = store.records();
        let record = &records[0];
        assert_eq!(record.status, RecordStatus::Pending);
        assert_eq!(record.attempts, 1);
        assert!(record.last_error.is_none());
        // Attempted at most once per run.
        assert_eq!(remote.call_count(), 1);
    }

    #[tokio::test]
    async fn retry_ceiling_marks_failed() {
        let (store, remote, processor) = setup();
        remote.set_connected(false);
        store.append(SyncRecord::delete("workout", "srv-1")).await.unwrap();

        for _ in 0..4 {
            let summary = processor.run_once().await.unwrap().summary().unwrap();
            assert_eq!(summary.still_pending, 1);
        }
        let summary = processor.run_once().await.unwrap().summary().unwrap();
        assert_eq!(summary, RunSummary { applied: 0, failed: 1, still_pending: 0 });

        let records = store.records();
        let record = &records[0];
        assert_eq!(record.attempts, 5);
        assert!(record
            .last_error
            .as_deref()
            .unwrap()
            .ends_with("(gave up after 5 attempts)"));

        processor.run_once().await.unwrap();
        assert_eq!(remote.call_count(), 5);
    }

    #[tokio::test]
    async fn requeue_grants_fresh_budget() {
        let store = Arc::new(InMemoryQueueStore::new());
        let remote = Arc::new(MockRemoteStore::new());
        let processor = SyncProcessor::new(
            SyncConfig::default().with_max_attempts(2),
            Arc::clone(&store),
            Arc::clone(&remote),
        );
        remote.set_connected(false);
        store.append(SyncRecord::delete("workout", "srv-1")).await.unwrap();

        processor.run_once().await.unwrap();
        processor.run_once().await.unwrap();
        assert_eq!(store.records()[0].status, RecordStatus::Failed);

        assert_eq!(processor.requeue_failed().await.unwrap(), 1);
        processor.run_once().await.unwrap();
        let records = store.records();
        let record = &records[0];
        assert_eq!(record.status, RecordStatus::Pending);
        assert_eq!(record.attempts, 3);

        remote.set_connected(true);
        let summary = processor.run_once().await.unwrap().summary().unwrap();
        assert_eq!(summary.applied, 1);
    }

    #[tokio::test]
    async fn later_update_waits_for_earlier_one() {
        let (store, remote, processor) = setup();
        remote.seed("workout", "srv-1", Payload::new());
        remote.fail_next("srv-1", RemoteError::Timeout);

        let first = SyncRecord::update("workout", "srv-1", payload(json!({"name": "A"})));
        let second = SyncRecord::update("workout", "srv-1", payload(json!({"name": "B"})));
        store.append(first).await.unwrap();
        store.append(second).await.unwrap();

        processor.run_once().await.unwrap();
        // Only the first was attempted; the second stays behind it.
        assert_eq!(remote.call_count(), 1);

        processor.run_once().await.unwrap();
        let names: Vec<_> = remote
            .calls()
            .iter()
            .filter_map(|call| call.payload().map(|p| p["name"].clone()))
            .collect();
        assert_eq!(names, vec![json!("A"), json!("A"), json!("B")]);
        assert_eq!(remote.entity("workout", "srv-1").unwrap()["name"], "B");
    }

    #[tokio::test]
    async fn failed_record_blocks_same_entity_only() {
        let (store, remote, processor) = setup();
        remote.seed("workout", "srv-2", Payload::new());

        store
            .append(SyncRecord::update("workout", "srv-1", payload(json!({"name": "A"}))))
            .await
            .unwrap();
        store
            .append(SyncRecord::delete("workout", "srv-1"))
            .await
            .unwrap();
        store
            .append(SyncRecord::update("workout", "srv-2", payload(json!({"name": "C"}))))
            .await
            .unwrap();

        let summary = processor.run_once().await.unwrap().summary().unwrap();
        assert_eq!(summary, RunSummary { applied: 1, failed: 1, still_pending: 1 });
        assert_eq!(remote.entity("workout", "srv-2").unwrap()["name"], "C");
    }

    #[tokio::test]
    async fn concurrent_runs_are_single_flight() {
        let (store, remote, processor) = setup();
        store
            .append(SyncRecord::create("workout", "local-1", Payload::new()))
            .await
            .unwrap();

        let (a, b) = tokio::join!(processor.run_once(), processor.run_once());
        let outcomes = [a.unwrap(), b.unwrap()];
        assert_eq!(
            outcomes.iter().filter(|o| **o == RunOutcome::AlreadyRunning).count(),
            1
        );
        assert_eq!(remote.call_count(), 1);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn storage_fault_aborts_and_releases_flag() {
        let (store, remote, processor) = setup();
        store.append(SyncRecord::delete("workout", "srv-1")).await.unwrap();
        store.set_fail_writes(true);

        let err = processor.run_once().await.unwrap_err();
        assert!(matches!(err, crate::SyncError::Storage(QueueError::Io(_))));
        assert!(!processor.is_running());
        assert_eq!(remote.call_count(), 0);

        store.set_fail_writes(false);
        let summary = processor.run_once().await.unwrap().summary().unwrap();
        assert_eq!(summary.applied, 1);
    }

    #[tokio::test]
    async fn in_flight_after_crash_is_dispatched() {
        let (store, remote, processor) = setup();
        let mut record = SyncRecord::create("workout", "local-1", Payload::new());
        record.status = RecordStatus::InFlight;
        record.attempts = 1;
        let id = record.id.clone();
        store.append(record).await.unwrap();

        // The insert landed before the crash.
        remote.insert("workout", id.as_str(), &Payload::new()).await.unwrap();

        let summary = processor.run_once().await.unwrap().summary().unwrap();
        assert_eq!(summary.applied, 1);
        assert_eq!(remote.entity_count(), 1);
    }

    #[tokio::test]
    async fn discard_only_removes_failed() {
        let (store, _remote, processor) = setup();
        let pending = SyncRecord::delete("workout", "srv-1");
        let pending_id = pending.id.clone();
        let mut failed = SyncRecord::delete("workout", "srv-2");
        failed.status = RecordStatus::Failed;
        let failed_id = failed.id.clone();
        store.append(pending).await.unwrap();
        store.append(failed).await.unwrap();

        assert!(!processor.discard(&pending_id).await.unwrap());
        assert!(processor.discard(&failed_id).await.unwrap());
        assert!(!processor.discard(&RecordId::from("missing")).await.unwrap());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn recover_resets_in_flight() {
        let (store, _remote, processor) = setup();
        let mut record = SyncRecord::delete("workout", "srv-1");
        record.status = RecordStatus::InFlight;
        store.append(record).await.unwrap();

        assert_eq!(processor.recover().await.unwrap(), 1);
        assert_eq!(store.records()[0].status, RecordStatus::Pending);
    }

    #[tokio::test]
    async fn record_queued_after_create_uses_server_id() {
        let (store, remote, processor) = setup();
        remote.set_next_id(3);
        store
            .append(SyncRecord::create("workout", "local-1", payload(json!({"name": "Pull"}))))
            .await
            .unwrap();
        processor.run_once().await.unwrap();
        assert_eq!(
            store.remaps().await.unwrap().get("local-1").map(String::as_str),
            Some("srv-3")
        );

        store
            .append(SyncRecord::update("workout", "local-1", payload(json!({"name": "Pull day"}))))
            .await
            .unwrap();
        let summary = processor.run_once().await.unwrap().summary().unwrap();
        assert_eq!(summary, RunSummary { applied: 1, failed: 0, still_pending: 0 });

        let calls = remote.calls();
        assert!(matches!(calls.last(), Some(RemoteCall::Update { entity_id, .. }) if entity_id == "srv-3"));
        assert_eq!(remote.entity("workout", "srv-3").unwrap()["name"], "Pull day");
    }

    #[tokio::test]
    async fn stored_mappings_are_loaded() {
        let (store, remote, processor) = setup();
        remote.seed("workout", "srv-5", Payload::new());
        store.record_remap("local-1", "srv-5").await.unwrap();
        assert_eq!(processor.resolve_id("local-1"), None);

        processor.recover().await.unwrap();
        assert_eq!(processor.resolve_id("local-1").as_deref(), Some("srv-5"));

        let (store, remote, processor) = setup();
        remote.seed("workout", "srv-5", Payload::new());
        store.record_remap("local-1", "srv-5").await.unwrap();
        store
            .append(SyncRecord::delete("workout", "local-1"))
            .await
            .unwrap();
        processor.run_once().await.unwrap();
        assert!(matches!(&remote.calls()[0], RemoteCall::Delete { entity_id, .. } if entity_id == "srv-5"));
        assert_eq!(remote.entity_count(), 0);
    }
}
