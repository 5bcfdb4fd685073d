//! Property-based test generators using proptest.
//!
//! Provides strategies for generating random queue contents and failure
//! scripts that keep the invariants the engine relies on.

use liftsync_queue::{Operation, Payload, SyncRecord};
use proptest::prelude::*;
use serde_json::Value;

/// Strategy for entity type tags used by the client.
pub fn entity_type_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("workout".to_string()),
        Just("workoutSet".to_string()),
        Just("profile".to_string()),
    ]
}

/// Strategy for server-side entity ids.
pub fn server_id_strategy() -> impl Strategy<Value = String> {
    (1u32..50).prop_map(|n| format!("srv-{n}"))
}

/// Strategy for scalar JSON values found in payloads.
pub fn value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<bool>().prop_map(Value::from),
        (0i64..1_000).prop_map(Value::from),
        prop::string::string_regex("[a-zA-Z ]{0,16}")
            .expect("Invalid regex")
            .prop_map(Value::from),
    ]
}

/// Strategy for payloads with up to four fields.
pub fn payload_strategy() -> impl Strategy<Value = Payload> {
    prop::collection::btree_map(
        prop::string::string_regex("[a-z][a-zA-Z]{0,11}").expect("Invalid regex"),
        value_strategy(),
        0..4,
    )
    .prop_map(|fields| fields.into_iter().collect())
}

/// Strategy for operations.
pub fn operation_strategy() -> impl Strategy<Value = Operation> {
    prop_oneof![
        Just(Operation::Create),
        Just(Operation::Update),
        Just(Operation::Delete),
    ]
}

/// Strategy for pending records targeting existing server entities.
pub fn record_strategy() -> impl Strategy<Value = SyncRecord> {
    (
        entity_type_strategy(),
        server_id_strategy(),
        operation_strategy(),
        payload_strategy(),
    )
        .prop_map(|(entity_type, entity_id, operation, payload)| {
            let payload = if operation == Operation::Delete {
                Payload::new()
            } else {
                payload
            };
            SyncRecord::new(entity_type, entity_id, operation, payload)
        })
}

/// One queued update in an ordering scenario.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedUpdate {
    /// Index of the target entity.
    pub entity: usize,
    /// Transient failures the remote reports before accepting it.
    pub transient_failures: u32,
}

/// Strategy for a sequence of updates over `entities` entities, each failing
/// transiently up to `max_failures` times.
pub fn update_plan_strategy(
    entities: usize,
    max_failures: u32,
    max_len: usize,
) -> impl Strategy<Value = Vec<PlannedUpdate>> {
    prop::collection::vec(
        (0..entities, 0..=max_failures).prop_map(|(entity, transient_failures)| PlannedUpdate {
            entity,
            transient_failures,
        }),
        1..=max_len,
    )
}


