//! Record fixtures and queue helpers.

use chrono::{DateTime, Duration, TimeZone, Utc};
use liftsync_queue::{FileQueueStore, Payload, RecordId, SyncRecord};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// Converts a JSON object literal into a payload.
///
/// # Panics
///
/// Panics if `value` is not an object.
pub fn payload(value: serde_json::Value) -> Payload {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("payload must be a JSON object, got {other}"),
    }
}

/// Hands out strictly increasing `created_at` timestamps.
///
/// Records created back-to-back with `Utc::now()` can share a timestamp;
/// tests that care about ordering stamp them with a clock instead.
#[derive(Debug, Clone)]
pub struct RecordClock {
    next: DateTime<Utc>,
}

impl RecordClock {
    /// Starts at 2026-03-01 08:00:00 UTC.
    pub fn new() -> Self {
        Self {
            next: Utc
                .with_ymd_and_hms(2026, 3, 1, 8, 0, 0)
                .single()
                .expect("valid fixture time"),
        }
    }

    /// Returns the next timestamp, one second after the previous one.
    pub fn tick(&mut self) -> DateTime<Utc> {
        let now = self.next;
        self.next += Duration::seconds(1);
        now
    }

    /// Sets the record's `created_at` to the next timestamp.
    pub fn stamp(&mut self, record: SyncRecord) -> SyncRecord {
        let at = self.tick();
        record.with_created_at(at)
    }
}

impl Default for RecordClock {
    fn default() -> Self {
        Self::new()
    }
}

/// A `Create` of a workout.
pub fn workout(local_id: &str, name: &str) -> SyncRecord {
    SyncRecord::create(
        "workout",
        local_id,
        payload(serde_json::json!({ "name": name })),
    )
}

/// A `Create` of a set inside `workout_id`.
pub fn workout_set(local_id: &str, workout_id: &str, reps: u32, weight_kg: f64) -> SyncRecord {
    SyncRecord::create(
        "workoutSet",
        local_id,
        payload(serde_json::json!({
            "workoutId": workout_id,
            "reps": reps,
            "weightKg": weight_kg,
        })),
    )
}

/// An `Update` renaming a workout.
pub fn rename_workout(workout_id: &str, name: &str) -> SyncRecord {
    SyncRecord::update(
        "workout",
        workout_id,
        payload(serde_json::json!({ "name": name })),
    )
}

/// A `Delete` of a workout.
pub fn delete_workout(workout_id: &str) -> SyncRecord {
    SyncRecord::delete("workout", workout_id)
}

/// Makes `record` wait for `dependency`.
pub fn depending_on(record: SyncRecord, dependency: &RecordId) -> SyncRecord {
    record.with_depends_on(dependency.clone())
}

/// A queue file in a temporary directory that is removed on drop.
pub struct TempQueue {
    path: PathBuf,
    _temp_dir: TempDir,
}

impl TempQueue {
    /// Creates a fresh temporary directory; the queue file does not exist yet.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        Self {
            path: temp_dir.path().join("sync").join("queue.lsq"),
            _temp_dir: temp_dir,
        }
    }

    /// Returns the queue file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Opens the queue file.
    ///
    /// Only one store may be open at a time; drop the previous one first to
    /// simulate a restart.
    pub fn open(&self) -> FileQueueStore {
        FileQueueStore::open(&self.path).expect("Failed to open queue file")
    }

    /// Opens the queue file behind an `Arc`.
    pub fn open_shared(&self) -> Arc<FileQueueStore> {
        Arc::new(self.open())
    }
}

impl Default for TempQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs a future to completion on a fresh single-threaded runtime.
///
/// For synchronous test harnesses such as proptest.
pub fn block_on<F: Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("Failed to build runtime")
        .block_on(future)
}

#[cfg(test)]
mod tests {
    use super::*;
    use liftsync_queue::{Operation, QueueStore};

    #[test]
    fn clock_is_strictly_increasing() {
        let mut clock = RecordClock::new();
        let a = clock.tick();
        let b = clock.tick();
        assert!(a < b);
    }

    #[test]
    fn fixtures_have_expected_shape() {
        let set = workout_set("local-2", "local-1", 8, 62.5);
        assert_eq!(set.operation, Operation::Create);
        assert_eq!(set.entity_type, "workoutSet");
        assert_eq!(set.payload["workoutId"], "local-1");

        let create = workout("local-1", "Push");
        let rename = depending_on(rename_workout("local-1", "Push A"), &create.id);
        assert_eq!(rename.depends_on, Some(create.id));
    }

    #[test]
    #[should_panic(expected = "payload must be a JSON object")]
    fn payload_rejects_non_objects() {
        payload(serde_json::json!([1, 2]));
    }

    #[test]
    fn temp_queue_reopens() {
        let queue = TempQueue::new();
        block_on(async {
            let store = queue.open();
            store.append(delete_workout("srv-1")).await.unwrap();
        });

        let store = queue.open();
        assert_eq!(store.len(), 1);
        assert!(queue.path().exists());
    }
}
