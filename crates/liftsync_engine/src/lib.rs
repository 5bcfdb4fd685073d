//! # liftsync Engine
//!
//! Offline synchronization engine for the liftsync workout client.
//!
//! This crate provides:
//! - Queue processing with per-entity ordering and dependency gating
//! - Local-to-server id remapping after creates
//! - Retry classification with a per-record attempt ceiling
//! - Last-write-wins conflict policy for updates
//! - Pending/failed status with change notification
//! - Background scheduling on explicit, reconnect and periodic triggers
//! - HTTP remote store abstraction
//!
//! ## Architecture
//!
//! Every mutation the client makes is queued locally first and applied to
//! the remote store later, one record at a time:
//! 1. `enqueue` appends a [`liftsync_queue::SyncRecord`] durably
//! 2. A trigger calls [`SyncEngine::run_once`]
//! 3. Each eligible record is dispatched and removed on success
//! 4. Subscribers receive the new [`SyncStatus`]
//!
//! ## Key Invariants
//!
//! - At most one run is active at a time
//! - Records for one entity are applied in queue order
//! - A dependent record waits until its dependency was applied and remapped
//! - A record is attempted at most once per run
//! - Failed records are only retried on explicit request

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod config;
mod engine;
mod error;
mod http;
pub mod network;
mod processor;
mod remap;
mod remote;
mod resolver;
mod scheduler;
mod status;

pub use config::{SyncConfig, DEFAULT_MAX_ATTEMPTS, DEFAULT_POLL_INTERVAL, DEFAULT_REQUEST_TIMEOUT};
pub use engine::SyncEngine;
pub use error::{DispatchFailure, FailureKind, RemoteError, SyncError, SyncResult};
pub use http::{HttpClient, HttpMethod, HttpRemoteStore, HttpRequest, HttpResponse, IDEMPOTENCY_HEADER};
pub use network::{NetworkMonitor, NetworkSignal, OnlineEvents};
pub use processor::{RunOutcome, RunSummary, SyncProcessor};
pub use remap::IdRemapTable;
pub use remote::{MockRemoteStore, RemoteCall, RemoteStore};
pub use resolver::{ConflictResolver, LastWriteWins};
pub use scheduler::{SchedulerHandle, SyncScheduler};
pub use status::{summarize, StatusAggregator, SyncStatus};
