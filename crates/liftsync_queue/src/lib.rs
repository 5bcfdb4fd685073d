//! # liftsync Queue
//!
//! Durable queue of pending mutations for the liftsync offline sync engine.
//!
//! Every data-mutating action the client performs while offline (or before the
//! remote store has acknowledged it) is captured as a [`SyncRecord`] and
//! appended to a [`QueueStore`]. The sync engine later drains the queue against
//! the remote store.
//!
//! ## Design Principles
//!
//! - Stores are explicit dependencies, never global state
//! - `list` always returns records ordered by `created_at` (append order on ties)
//! - `update` and `remove` on an absent id are no-ops, not errors
//! - Storage-medium failures are propagated, never swallowed
//!
//! ## Available Stores
//!
//! - [`InMemoryQueueStore`] - For tests and ephemeral sessions
//! - [`FileQueueStore`] - Crash-safe snapshot file guarded by an advisory lock
//!
//! ## Example
//!
//! ```rust
//! use liftsync_queue::{InMemoryQueueStore, QueueStore, SyncRecord};
//! use serde_json::json;
//!
//! # let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
//! # rt.block_on(async {
//! let store = InMemoryQueueStore::new();
//! let payload = json!({ "name": "Leg day" }).as_object().cloned().unwrap();
//! store.append(SyncRecord::create("workout", "local-1", payload)).await.unwrap();
//! assert_eq!(store.list().await.unwrap().len(), 1);
//! # });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod error;
mod file;
mod maintenance;
mod memory;
mod record;
mod store;

pub use error::{QueueError, QueueResult};
pub use file::{FileQueueStore, QUEUE_FORMAT_VERSION, QUEUE_MAGIC};
pub use maintenance::{discard_failed, recover_in_flight, requeue_failed};
pub use memory::InMemoryQueueStore;
pub use record::{EntityKey, Operation, Payload, RecordId, RecordPatch, RecordStatus, SyncRecord};
pub use store::QueueStore;
