//! Background sync triggers.
//!
//! Three things start a run: an explicit request, the network coming back,
//! and a periodic timer. All of them funnel into [`SyncEngine::run_once`],
//! whose single-flight guard collapses overlapping triggers.

use crate::engine::SyncEngine;
use crate::network::OnlineEvents;
use crate::remote::RemoteStore;
use liftsync_queue::QueueStore;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info};

/// Why a run was started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    Explicit,
    Reconnect,
    Periodic,
}

impl Trigger {
    fn as_str(self) -> &'static str {
        match self {
            Trigger::Explicit => "explicit",
            Trigger::Reconnect => "reconnect",
            Trigger::Periodic => "periodic",
        }
    }
}

/// Spawns the background sync task.
pub struct SyncScheduler;

impl SyncScheduler {
    /// Starts the scheduler on the current tokio runtime.
    ///
    /// The timer fires every `poll_interval` (first tick immediately) and
    /// only starts a run when records are pending and the network is up.
    /// Reconnect events and explicit triggers always start a run.
    ///
    /// Dropping the returned handle stops the task after any active run.
    pub fn spawn<S, R>(engine: Arc<SyncEngine<S, R>>) -> SchedulerHandle
    where
        S: QueueStore + 'static,
        R: RemoteStore + 'static,
    {
        let (trigger_tx, trigger_rx) = mpsc::channel(1);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        // Subscribe before spawning so a reconnect right after this call is seen.
        let online_events = engine.network().online_events();
        let task = tokio::spawn(run_loop(engine, online_events, trigger_rx, shutdown_rx));
        SchedulerHandle {
            trigger: trigger_tx,
            shutdown: Some(shutdown_tx),
            task: Some(task),
        }
    }
}

/// Controls a running scheduler.
#[derive(Debug)]
pub struct SchedulerHandle {
    trigger: mpsc::Sender<()>,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl SchedulerHandle {
    /// Requests a run as soon as possible.
    ///
    /// Requests made while one is already waiting are merged.
    pub fn trigger(&self) {
        // A full channel already holds a pending request.
        let _ = self.trigger.try_send(());
    }

    /// Stops the scheduler and waits for it to finish. An active run is
    /// allowed to complete.
    pub async fn shutdown(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                error!(error = %e, "sync scheduler task panicked");
            }
        }
    }
}

async fn run_loop<S, R>(
    engine: Arc<SyncEngine<S, R>>,
    mut online_events: OnlineEvents,
    mut triggers: mpsc::Receiver<()>,
    mut shutdown: oneshot::Receiver<()>,
) where
    S: QueueStore + 'static,
    R: RemoteStore + 'static,
{
    let mut interval = time::interval(engine.config().poll_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut watching_network = true;

    info!(
        poll_interval_ms = engine.config().poll_interval.as_millis() as u64,
        "sync scheduler started"
    );

    loop {
        tokio::select! {
            biased;

            // Fires on an explicit shutdown and when the handle is dropped.
            _ = &mut shutdown => break,

            Some(()) = triggers.recv() => run(&engine, Trigger::Explicit).await,

            event = online_events.next(), if watching_network => match event {
                Some(()) => run(&engine, Trigger::Reconnect).await,
                None => watching_network = false,
            },

            _ = interval.tick() => periodic(&engine).await,
        }
    }

    info!("sync scheduler stopped");
}

async fn periodic<S: QueueStore, R: RemoteStore>(engine: &SyncEngine<S, R>) {
    match engine.refresh_status().await {
        Ok(status) if status.pending > 0 && engine.network().is_online() => {
            run(engine, Trigger::Periodic).await;
        }
        Ok(_) => {}
        Err(e) => error!(error = %e, "failed to read sync queue"),
    }
}

async fn run<S: QueueStore, R: RemoteStore>(engine: &SyncEngine<S, R>, trigger: Trigger) {
    match engine.run_once().await {
        Ok(outcome) => debug!(trigger = trigger.as_str(), ?outcome, "sync run finished"),
        Err(e) => error!(trigger = trigger.as_str(), error = %e, "sync run failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SyncConfig;
    use crate::network;
    use crate::remote::MockRemoteStore;
    use crate::status::SyncStatus;
    use liftsync_queue::{InMemoryQueueStore, SyncRecord};
    use std::time::Duration;
    use tokio::time::timeout;

    fn engine_with(
        poll_interval: Duration,
        signal: network::NetworkSignal,
    ) -> (Arc<MockRemoteStore>, Arc<SyncEngine<InMemoryQueueStore, MockRemoteStore>>) {
        let remote = Arc::new(MockRemoteStore::new());
        let engine = SyncEngine::new(
            SyncConfig::default().with_poll_interval(poll_interval),
            Arc::new(InMemoryQueueStore::new()),
            Arc::clone(&remote),
        )
        .unwrap()
        .with_network(signal);
        (remote, Arc::new(engine))
    }

    async fn wait_idle(engine: &SyncEngine<InMemoryQueueStore, MockRemoteStore>) {
        let mut rx = engine.subscribe_status();
        timeout(Duration::from_secs(5), rx.wait_for(|s| *s == SyncStatus::default()))
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn explicit_trigger_runs() {
        let (remote, engine) = engine_with(Duration::from_secs(3600), network::NetworkSignal::always_online());
        let handle = SyncScheduler::spawn(Arc::clone(&engine));

        engine
            .enqueue(SyncRecord::delete("workout", "srv-1"))
            .await
            .unwrap();
        handle.trigger();
        wait_idle(&engine).await;
        assert_eq!(remote.call_count(), 1);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn reconnect_runs() {
        let (monitor, signal) = network::channel(false);
        let (remote, engine) = engine_with(Duration::from_secs(3600), signal);
        let handle = SyncScheduler::spawn(Arc::clone(&engine));

        engine
            .enqueue(SyncRecord::delete("workout", "srv-1"))
            .await
            .unwrap();
        // Give the first periodic tick a chance to pass while offline.
        tokio::task::yield_now().await;
        assert_eq!(remote.call_count(), 0);

        monitor.set_online(true);
        wait_idle(&engine).await;
        assert_eq!(remote.call_count(), 1);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn periodic_tick_runs_when_pending() {
        let (remote, engine) = engine_with(Duration::from_millis(20), network::NetworkSignal::always_online());
        engine
            .enqueue(SyncRecord::delete("workout", "srv-1"))
            .await
            .unwrap();

        let handle = SyncScheduler::spawn(Arc::clone(&engine));
        wait_idle(&engine).await;
        assert_eq!(remote.call_count(), 1);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn dropped_handle_stops_task() {
        let (_remote, engine) = engine_with(Duration::from_millis(10), network::NetworkSignal::always_online());
        let handle = SyncScheduler::spawn(Arc::clone(&engine));
        drop(handle);

        // The task holds the only other reference to the engine.
        timeout(Duration::from_secs(5), async {
            while Arc::strong_count(&engine) > 1 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
    }
}
