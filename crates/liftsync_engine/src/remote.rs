//! Remote store abstraction.

use crate::error::RemoteError;
use async_trait::async_trait;
use liftsync_queue::Payload;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// The remote data store the queue is reconciled against.
///
/// One call per mutation, keyed by entity id. This trait abstracts the
/// network layer, allowing for different implementations (HTTP, an in-process
/// backend, a mock for testing).
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Inserts a new entity and returns its server-assigned id.
    ///
    /// `idempotency_key` is stable across retries of the same mutation, so a
    /// remote that deduplicates on it never creates the entity twice.
    async fn insert(
        &self,
        entity_type: &str,
        idempotency_key: &str,
        payload: &Payload,
    ) -> Result<String, RemoteError>;

    /// Overwrites an existing entity with `payload`.
    async fn update(
        &self,
        entity_type: &str,
        entity_id: &str,
        payload: &Payload,
    ) -> Result<(), RemoteError>;

    /// Deletes an entity. Reports [`RemoteError::NotFound`] if it is absent.
    async fn delete(&self, entity_type: &str, entity_id: &str) -> Result<(), RemoteError>;
}

/// A call received by [`MockRemoteStore`].
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteCall {
    /// `insert` call.
    Insert {
        /// Collection tag.
        entity_type: String,
        /// Idempotency key sent with the call.
        idempotency_key: String,
        /// Payload sent.
        payload: Payload,
    },
    /// `update` call.
    Update {
        /// Collection tag.
        entity_type: String,
        /// Target entity.
        entity_id: String,
        /// Payload sent.
        payload: Payload,
    },
    /// `delete` call.
    Delete {
        /// Collection tag.
        entity_type: String,
        /// Target entity.
        entity_id: String,
    },
}

impl RemoteCall {
    /// Returns the payload sent with the call, if any.
    pub fn payload(&self) -> Option<&Payload> {
        match self {
            RemoteCall::Insert { payload, .. } | RemoteCall::Update { payload, .. } => {
                Some(payload)
            }
            RemoteCall::Delete { .. } => None,
        }
    }
}

/// An in-memory remote store for testing.
///
/// Assigns ids `srv-1`, `srv-2`, ... and deduplicates inserts by idempotency
/// key. Every call yields to the runtime once before doing anything, so
/// concurrent callers genuinely interleave.
#[derive(Debug)]
pub struct MockRemoteStore {
    connected: AtomicBool,
    next_id: AtomicU64,
    entities: Mutex<HashMap<(String, String), Payload>>,
    idempotency: Mutex<HashMap<String, String>>,
    insert_failures: Mutex<HashMap<String, VecDeque<RemoteError>>>,
    entity_failures: Mutex<HashMap<String, VecDeque<RemoteError>>>,
    calls: Mutex<Vec<RemoteCall>>,
}

impl MockRemoteStore {
    /// Creates a new, connected, empty mock remote.
    pub fn new() -> Self {
        Self {
            connected: AtomicBool::new(true),
            next_id: AtomicU64::new(1),
            entities: Mutex::new(HashMap::new()),
            idempotency: Mutex::new(HashMap::new()),
            insert_failures: Mutex::new(HashMap::new()),
            entity_failures: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Sets the numeric part of the next assigned id.
    pub fn set_next_id(&self, next: u64) {
        self.next_id.store(next, Ordering::SeqCst);
    }

    /// Sets the connected state. While disconnected every call fails with
    /// [`RemoteError::Unavailable`].
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// Returns true if the mock accepts calls.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Stores an entity as if another client had created it.
    pub fn seed(&self, entity_type: &str, entity_id: &str, payload: Payload) {
        self.entities
            .lock()
            .insert((entity_type.to_string(), entity_id.to_string()), payload);
    }

    /// Returns the stored entity, if present.
    pub fn entity(&self, entity_type: &str, entity_id: &str) -> Option<Payload> {
        self.entities
            .lock()
            .get(&(entity_type.to_string(), entity_id.to_string()))
            .cloned()
    }

    /// Returns the number of stored entities.
    pub fn entity_count(&self) -> usize {
        self.entities.lock().len()
    }

    /// Makes the next insert of `entity_type` fail with `error`.
    ///
    /// Calls queue up: scripting two failures fails the next two inserts.
    pub fn fail_next_insert(&self, entity_type: &str, error: RemoteError) {
        self.insert_failures
            .lock()
            .entry(entity_type.to_string())
            .or_default()
            .push_back(error);
    }

    /// Makes the next update or delete of `entity_id` fail with `error`.
    pub fn fail_next(&self, entity_id: &str, error: RemoteError) {
        self.entity_failures
            .lock()
            .entry(entity_id.to_string())
            .or_default()
            .push_back(error);
    }

    /// Returns every call received so far, in order.
    pub fn calls(&self) -> Vec<RemoteCall> {
        self.calls.lock().clone()
    }

    /// Returns the number of calls received so far.
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    fn receive(&self, call: RemoteCall) -> Result<(), RemoteError> {
        self.calls.lock().push(call);
        if self.is_connected() {
            Ok(())
        } else {
            Err(RemoteError::Unavailable("not connected".into()))
        }
    }

    fn scripted(
        failures: &Mutex<HashMap<String, VecDeque<RemoteError>>>,
        key: &str,
    ) -> Result<(), RemoteError> {
        match failures.lock().get_mut(key).and_then(VecDeque::pop_front) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

impl Default for MockRemoteStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteStore for MockRemoteStore {
    async fn insert(
        &self,
        entity_type: &str,
        idempotency_key: &str,
        payload: &Payload,
    ) -> Result<String, RemoteError> {
        tokio::task::yield_now().await;
        self.receive(RemoteCall::Insert {
            entity_type: entity_type.to_string(),
            idempotency_key: idempotency_key.to_string(),
            payload: payload.clone(),
        })?;
        Self::scripted(&self.insert_failures, entity_type)?;

        let mut idempotency = self.idempotency.lock();
        if let Some(existing) = idempotency.get(idempotency_key) {
            return Ok(existing.clone());
        }
        let id = format!("srv-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        idempotency.insert(idempotency_key.to_string(), id.clone());
        self.seed(entity_type, &id, payload.clone());
        Ok(id)
    }

    async fn update(
        &self,
        entity_type: &str,
        entity_id: &str,
        payload: &Payload,
    ) -> Result<(), RemoteError> {
        tokio::task::yield_now().await;
        self.receive(RemoteCall::Update {
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            payload: payload.clone(),
        })?;
        Self::scripted(&self.entity_failures, entity_id)?;

        let mut entities = self.entities.lock();
        match entities.get_mut(&(entity_type.to_string(), entity_id.to_string())) {
            Some(stored) => {
                stored.clone_from(payload);
                Ok(())
            }
            None => Err(RemoteError::NotFound),
        }
    }

    async fn delete(&self, entity_type: &str, entity_id: &str) -> Result<(), RemoteError> {
        tokio::task::yield_now().await;
        self.receive(RemoteCall::Delete {
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
        })?;
        Self::scripted(&self.entity_failures, entity_id)?;

        self.entities
            .lock()
            .remove(&(entity_type.to_string(), entity_id.to_string()))
            .map(|_| ())
            .ok_or(RemoteError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: serde_json::Value) -> Payload {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn mock_assigns_sequential_ids() {
        let remote = MockRemoteStore::new();
        remote.set_next_id(42);

        let id = remote
            .insert("workout", "rec-1", &payload(json!({"name": "Legs"})))
            .await
            .unwrap();
        assert_eq!(id, "srv-42");
        assert_eq!(remote.entity("workout", "srv-42").unwrap()["name"], "Legs");
    }

    #[tokio::test]
    async fn mock_insert_deduplicates_by_key() {
        let remote = MockRemoteStore::new();
        let body = payload(json!({"name": "Legs"}));

        let first = remote.insert("workout", "rec-1", &body).await.unwrap();
        let second = remote.insert("workout", "rec-1", &body).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(remote.entity_count(), 1);
        assert_eq!(remote.call_count(), 2);
    }

    #[tokio::test]
    async fn mock_not_connected_error() {
        let remote = MockRemoteStore::new();
        remote.set_connected(false);

        let result = remote.delete("workout", "srv-1").await;
        assert!(matches!(result, Err(RemoteError::Unavailable(_))));
    }

    #[tokio::test]
    async fn mock_update_and_delete_missing() {
        let remote = MockRemoteStore::new();
        let body = payload(json!({"name": "Legs"}));

        assert_eq!(
            remote.update("workout", "srv-9", &body).await,
            Err(RemoteError::NotFound)
        );
        assert_eq!(
            remote.delete("workout", "srv-9").await,
            Err(RemoteError::NotFound)
        );
    }

    #[tokio::test]
    async fn mock_scripted_failures_are_consumed() {
        let remote = MockRemoteStore::new();
        remote.seed("workout", "srv-1", Payload::new());
        remote.fail_next("srv-1", RemoteError::Timeout);

        let body = payload(json!({"name": "Legs"}));
        assert_eq!(
            remote.update("workout", "srv-1", &body).await,
            Err(RemoteError::Timeout)
        );
        assert!(remote.update("workout", "srv-1", &body).await.is_ok());
        assert_eq!(remote.entity("workout", "srv-1").unwrap(), body);
    }

    #[tokio::test]
    async fn mock_scripted_insert_failure() {
        let remote = MockRemoteStore::new();
        remote.fail_next_insert("workout", RemoteError::Rejected("name required".into()));

        let result = remote.insert("workout", "rec-1", &Payload::new()).await;
        assert!(matches!(result, Err(RemoteError::Rejected(_))));
        assert_eq!(remote.entity_count(), 0);
    }
}
