//! The sync engine facade.

use crate::config::SyncConfig;
use crate::error::SyncResult;
use crate::network::NetworkSignal;
use crate::processor::{RunOutcome, SyncProcessor};
use crate::remote::RemoteStore;
use crate::resolver::ConflictResolver;
use crate::status::{StatusAggregator, SyncStatus};
use liftsync_queue::{QueueStore, RecordId, SyncRecord};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};

/// Offline sync engine.
///
/// Owns the processor, the status aggregator and the connectivity signal
/// for one queue. This is the surface presentation code talks to:
///
/// - [`enqueue`](Self::enqueue) when the user mutates data
/// - [`get_status`](Self::get_status) / [`subscribe_status`](Self::subscribe_status)
///   for the pending/failed badge
/// - [`run_once`](Self::run_once) and [`retry_failed`](Self::retry_failed)
///   for "sync now" and "retry" actions
///
/// Background triggers are handled by [`crate::SyncScheduler`].
pub struct SyncEngine<S: QueueStore, R: RemoteStore> {
    store: Arc<S>,
    processor: SyncProcessor<S, R>,
    status: StatusAggregator<S>,
    network: NetworkSignal,
}

impl<S: QueueStore, R: RemoteStore> SyncEngine<S, R> {
    /// Creates a new sync engine.
    ///
    /// Without [`with_network`](Self::with_network) the engine assumes it is
    /// always online.
    pub fn new(config: SyncConfig, store: Arc<S>, remote: Arc<R>) -> SyncResult<Self> {
        config.validate()?;
        Ok(Self {
            processor: SyncProcessor::new(config, Arc::clone(&store), remote),
            status: StatusAggregator::new(Arc::clone(&store)),
            store,
            network: NetworkSignal::always_online(),
        })
    }

    /// Attaches a connectivity signal.
    pub fn with_network(mut self, network: NetworkSignal) -> Self {
        self.network = network;
        self
    }

    /// Replaces the conflict resolver.
    pub fn with_resolver(mut self, resolver: impl ConflictResolver + 'static) -> Self {
        self.processor = self.processor.with_resolver(resolver);
        self
    }

    /// Gets the configuration.
    pub fn config(&self) -> &SyncConfig {
        self.processor.config()
    }

    /// Gets the connectivity signal.
    pub fn network(&self) -> &NetworkSignal {
        &self.network
    }

    /// Gets the queue store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Returns true while a run is active.
    pub fn is_running(&self) -> bool {
        self.processor.is_running()
    }

    /// Returns the server id a local placeholder id was remapped to.
    ///
    /// Mappings from earlier sessions appear after [`recover`](Self::recover)
    /// or the first run.
    pub fn resolve_id(&self, local_id: &str) -> Option<String> {
        self.processor.resolve_id(local_id)
    }

    /// Queues a mutation. The record is durable once this returns.
    pub async fn enqueue(&self, record: SyncRecord) -> SyncResult<RecordId> {
        let id = record.id.clone();
        debug!(
            record_id = %id,
            entity_type = %record.entity_type,
            entity_id = %record.entity_id,
            operation = %record.operation,
            "queued mutation"
        );
        self.store.append(record).await?;
        self.status.refresh().await?;
        Ok(id)
    }

    /// Drains the queue as far as possible.
    ///
    /// Returns [`RunOutcome::Offline`] without dispatching anything while the
    /// network signal reports offline, so offline periods do not use up retry
    /// budgets.
    pub async fn run_once(&self) -> SyncResult<RunOutcome> {
        if !self.network.is_online() {
            let status = self.status.refresh().await?;
            debug!(pending = status.pending, "offline, sync skipped");
            return Ok(RunOutcome::Offline(status));
        }

        let outcome = self.processor.run_once().await?;
        if let RunOutcome::Completed(summary) = outcome {
            self.status.publish(summary.status());
        }
        Ok(outcome)
    }

    /// Returns every failed record to pending and runs the queue.
    pub async fn retry_failed(&self) -> SyncResult<RunOutcome> {
        let requeued = self.processor.requeue_failed().await?;
        if requeued > 0 {
            info!(requeued, "retrying failed sync records");
        }
        self.status.refresh().await?;
        self.run_once().await
    }

    /// Removes a failed record the user chose to give up on.
    ///
    /// Returns false if the record is absent or not failed.
    pub async fn discard(&self, id: &RecordId) -> SyncResult<bool> {
        let removed = self.processor.discard(id).await?;
        self.status.refresh().await?;
        Ok(removed)
    }

    /// Returns records interrupted mid-dispatch to pending and loads the
    /// placeholder id mappings stored by earlier sessions. Call once at
    /// startup, before the first run.
    pub async fn recover(&self) -> SyncResult<usize> {
        let recovered = self.processor.recover().await?;
        self.status.refresh().await?;
        Ok(recovered)
    }

    /// Scans the queue for the current counts.
    pub async fn get_status(&self) -> SyncResult<SyncStatus> {
        self.status.get_status().await
    }

    /// Scans the queue and publishes the counts to subscribers.
    pub async fn refresh_status(&self) -> SyncResult<SyncStatus> {
        self.status.refresh().await
    }

    /// Returns a receiver that observes status changes.
    pub fn subscribe_status(&self) -> watch::Receiver<SyncStatus> {
        self.status.subscribe()
    }
}


