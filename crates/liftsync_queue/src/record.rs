//! Queued mutation records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Field values written by a mutation.
///
/// A full snapshot for `Create`/`Update`, empty for `Delete`.
pub type Payload = serde_json::Map<String, serde_json::Value>;

/// Unique identifier of a queued record.
///
/// Generated by the caller when the mutation happens and stable for the
/// record's whole lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Generates a new random record id.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for RecordId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Kind of mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// Entity was created locally.
    Create,
    /// Entity fields were changed.
    Update,
    /// Entity was deleted.
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// Lifecycle state of a queued record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    /// Waiting to be applied.
    Pending,
    /// Dispatched to the remote store, outcome not yet recorded.
    InFlight,
    /// Gave up; waits for an explicit retry or discard.
    Failed,
}

impl RecordStatus {
    /// Returns true if the record still counts as pending work.
    pub fn is_pending(&self) -> bool {
        matches!(self, RecordStatus::Pending | RecordStatus::InFlight)
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecordStatus::Pending => "pending",
            RecordStatus::InFlight => "in_flight",
            RecordStatus::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Identity of the entity a record targets.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityKey {
    /// Collection tag.
    pub entity_type: String,
    /// Entity id (local or server-assigned).
    pub entity_id: String,
}

/// One queued mutation awaiting remote application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncRecord {
    /// Record id.
    pub id: RecordId,
    /// Target collection ("workout", "workoutSet", "profile", ...).
    pub entity_type: String,
    /// Affected entity; may be a local placeholder id.
    pub entity_id: String,
    /// Mutation kind.
    pub operation: Operation,
    /// Field values to write.
    #[serde(default)]
    pub payload: Payload,
    /// Record this one is subordinate to.
    #[serde(default)]
    pub depends_on: Option<RecordId>,
    /// Current lifecycle state.
    pub status: RecordStatus,
    /// Number of prior attempts. Never decreases.
    pub attempts: u32,
    /// Value of `attempts` at the last user-initiated retry.
    #[serde(default)]
    pub retry_baseline: u32,
    /// Last failure description; only set while `Failed`.
    #[serde(default)]
    pub last_error: Option<String>,
    /// Local creation time.
    pub created_at: DateTime<Utc>,
}

impl SyncRecord {
    /// Creates a new pending record with a fresh id, stamped now.
    pub fn new(
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
        operation: Operation,
        payload: Payload,
    ) -> Self {
        Self {
            id: RecordId::generate(),
            entity_type: entity_type.into(),
            entity_id: entity_id.into(),
            operation,
            payload,
            depends_on: None,
            status: RecordStatus::Pending,
            attempts: 0,
            retry_baseline: 0,
            last_error: None,
            created_at: Utc::now(),
        }
    }

    /// Creates a `Create` record.
    pub fn create(
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
        payload: Payload,
    ) -> Self {
        Self::new(entity_type, entity_id, Operation::Create, payload)
    }

    /// Creates an `Update` record.
    pub fn update(
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
        payload: Payload,
    ) -> Self {
        Self::new(entity_type, entity_id, Operation::Update, payload)
    }

    /// Creates a `Delete` record with an empty payload.
    pub fn delete(entity_type: impl Into<String>, entity_id: impl Into<String>) -> Self {
        Self::new(entity_type, entity_id, Operation::Delete, Payload::new())
    }

    /// Sets the record id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<RecordId>) -> Self {
        self.id = id.into();
        self
    }

    /// Makes this record wait for another record.
    #[must_use]
    pub fn with_depends_on(mut self, id: RecordId) -> Self {
        self.depends_on = Some(id);
        self
    }

    /// Overrides the creation time.
    #[must_use]
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Returns the entity this record targets.
    pub fn entity_key(&self) -> EntityKey {
        EntityKey {
            entity_type: self.entity_type.clone(),
            entity_id: self.entity_id.clone(),
        }
    }

    /// Attempts made since the last user-initiated retry.
    pub fn attempts_since_retry(&self) -> u32 {
        self.attempts.saturating_sub(self.retry_baseline)
    }
}

/// A partial update to a queued record.
///
/// Fields left as `None` are untouched. `attempts` and `retry_baseline` can
/// only grow: a lower value is ignored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordPatch {
    /// New status.
    pub status: Option<RecordStatus>,
    /// New attempt count.
    pub attempts: Option<u32>,
    /// New last error (`Some(None)` clears it).
    pub last_error: Option<Option<String>>,
    /// Remapped entity id.
    pub entity_id: Option<String>,
    /// Remapped payload.
    pub payload: Option<Payload>,
    /// New retry baseline.
    pub retry_baseline: Option<u32>,
}

impl RecordPatch {
    /// Creates an empty patch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the status.
    #[must_use]
    pub fn status(mut self, status: RecordStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Sets the attempt count.
    #[must_use]
    pub fn attempts(mut self, attempts: u32) -> Self {
        self.attempts = Some(attempts);
        self
    }

    /// Sets the last error.
    #[must_use]
    pub fn last_error(mut self, message: impl Into<String>) -> Self {
        self.last_error = Some(Some(message.into()));
        self
    }

    /// Clears the last error.
    #[must_use]
    pub fn clear_error(mut self) -> Self {
        self.last_error = Some(None);
        self
    }

    /// Sets the entity id.
    #[must_use]
    pub fn entity_id(mut self, entity_id: impl Into<String>) -> Self {
        self.entity_id = Some(entity_id.into());
        self
    }

    /// Sets the payload.
    #[must_use]
    pub fn payload(mut self, payload: Payload) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Sets the retry baseline.
    #[must_use]
    pub fn retry_baseline(mut self, baseline: u32) -> Self {
        self.retry_baseline = Some(baseline);
        self
    }

    /// Returns true if the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Applies the patch to a record.
    pub fn apply(&self, record: &mut SyncRecord) {
        if let Some(status) = self.status {
            record.status = status;
        }
        if let Some(attempts) = self.attempts {
            record.attempts = record.attempts.max(attempts);
        }
        if let Some(last_error) = &self.last_error {
            record.last_error.clone_from(last_error);
        }
        if let Some(entity_id) = &self.entity_id {
            record.entity_id.clone_from(entity_id);
        }
        if let Some(payload) = &self.payload {
            record.payload.clone_from(payload);
        }
        if let Some(baseline) = self.retry_baseline {
            record.retry_baseline = record.retry_baseline.max(baseline);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: serde_json::Value) -> Payload {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn constructors_start_pending() {
        let record = SyncRecord::create("workout", "local-1", payload(json!({"name": "Push"})));
        assert_eq!(record.operation, Operation::Create);
        assert_eq!(record.status, RecordStatus::Pending);
        assert_eq!(record.attempts, 0);
        assert!(record.last_error.is_none());
        assert!(record.depends_on.is_none());

        let delete = SyncRecord::delete("workout", "srv-1");
        assert!(delete.payload.is_empty());
    }

    #[test]
    fn generated_ids_are_unique() {
        let a = SyncRecord::delete("workout", "1");
        let b = SyncRecord::delete("workout", "1");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn patch_cannot_lower_attempts() {
        let mut record = SyncRecord::delete("workout", "1");
        RecordPatch::new().attempts(3).apply(&mut record);
        assert_eq!(record.attempts, 3);

        RecordPatch::new().attempts(1).apply(&mut record);
        assert_eq!(record.attempts, 3);
    }

    #[test]
    fn patch_sets_and_clears_error() {
        let mut record = SyncRecord::delete("workout", "1");
        RecordPatch::new()
            .status(RecordStatus::Failed)
            .last_error("boom")
            .apply(&mut record);
        assert_eq!(record.status, RecordStatus::Failed);
        assert_eq!(record.last_error.as_deref(), Some("boom"));

        RecordPatch::new()
            .status(RecordStatus::Pending)
            .clear_error()
            .apply(&mut record);
        assert_eq!(record.status, RecordStatus::Pending);
        assert!(record.last_error.is_none());
    }

    #[test]
    fn patch_remaps_entity() {
        let mut record = SyncRecord::update("workoutSet", "local-7", payload(json!({"workoutId": "local-1"})));
        RecordPatch::new()
            .entity_id("srv-7")
            .payload(payload(json!({"workoutId": "srv-1"})))
            .apply(&mut record);
        assert_eq!(record.entity_id, "srv-7");
        assert_eq!(record.payload["workoutId"], "srv-1");
    }

    #[test]
    fn empty_patch() {
        assert!(RecordPatch::new().is_empty());
        assert!(!RecordPatch::new().attempts(1).is_empty());
    }

    #[test]
    fn attempts_since_retry() {
        let mut record = SyncRecord::delete("workout", "1");
        record.attempts = 7;
        record.retry_baseline = 5;
        assert_eq!(record.attempts_since_retry(), 2);
    }

    #[test]
    fn serde_uses_readable_tags() {
        let record = SyncRecord::delete("workout", "srv-1").with_id("rec-1");
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["id"], "rec-1");
        assert_eq!(value["operation"], "delete");
        assert_eq!(value["status"], "pending");
    }

    #[test]
    fn missing_retry_baseline_defaults_to_zero() {
        let value = json!({
            "id": "rec-1",
            "entity_type": "workout",
            "entity_id": "srv-1",
            "operation": "update",
            "payload": {"name": "Pull"},
            "status": "failed",
            "attempts": 5,
            "last_error": "timeout",
            "created_at": "2026-01-01T00:00:00Z"
        });
        let record: SyncRecord = serde_json::from_value(value).unwrap();
        assert_eq!(record.retry_baseline, 0);
        assert_eq!(record.attempts_since_retry(), 5);
    }
}
