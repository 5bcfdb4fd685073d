//! Local-to-server id remapping.

use liftsync_queue::{Payload, SyncRecord};
use serde_json::Value;
use std::collections::HashMap;

/// Maps client placeholder ids to the ids the remote store assigned.
///
/// Populated when a `Create` succeeds. Placeholder ids are assumed unique
/// across entity types, which holds for generated local ids.
#[derive(Debug, Default, Clone)]
pub struct IdRemapTable {
    ids: HashMap<String, String>,
}

impl IdRemapTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `local_id` is known remotely as `server_id`.
    pub fn insert(&mut self, local_id: impl Into<String>, server_id: impl Into<String>) {
        self.ids.insert(local_id.into(), server_id.into());
    }

    /// Returns the server id for `local_id`, if one was recorded.
    pub fn resolve(&self, local_id: &str) -> Option<&str> {
        self.ids.get(local_id).map(String::as_str)
    }

    /// Returns the number of recorded mappings.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns true if no mapping was recorded.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Rewrites the record's entity id and payload references in place.
    ///
    /// Returns true if anything changed.
    pub fn apply(&self, record: &mut SyncRecord) -> bool {
        if self.ids.is_empty() {
            return false;
        }
        let mut changed = false;
        if let Some(server_id) = self.resolve(&record.entity_id) {
            record.entity_id = server_id.to_string();
            changed = true;
        }
        for (local_id, server_id) in &self.ids {
            changed |= replace_in_payload(&mut record.payload, local_id, server_id);
        }
        changed
    }
}

/// Replaces every string value equal to `from` with `to`, at any depth.
///
/// Object keys are left alone. Returns true if a value was replaced.
pub fn replace_in_payload(payload: &mut Payload, from: &str, to: &str) -> bool {
    let mut changed = false;
    for value in payload.values_mut() {
        changed |= replace_in_value(value, from, to);
    }
    changed
}

fn replace_in_value(value: &mut Value, from: &str, to: &str) -> bool {
    match value {
        Value::String(s) if s == from => {
            *s = to.to_string();
            true
        }
        Value::Array(items) => items
            .iter_mut()
            .fold(false, |changed, item| replace_in_value(item, from, to) | changed),
        Value::Object(map) => replace_in_payload(map, from, to),
        _ => false,
    }
}

/// Returns true if the record refers to `id` as its entity or in its payload.
pub fn references(record: &SyncRecord, id: &str) -> bool {
    record.entity_id == id || record.payload.values().any(|value| value_references(value, id))
}

fn value_references(value: &Value, id: &str) -> bool {
    match value {
        Value::String(s) => s == id,
        Value::Array(items) => items.iter().any(|item| value_references(item, id)),
        Value::Object(map) => map.values().any(|item| value_references(item, id)),
        _ => false,
    }
}


