//! Property-Based Tests for the Store
//!
//! Uses proptest to check round-trip and invalidation behaviour over the
//! in-memory backend.

use proptest::prelude::*;
use serde_json::Value;
use std::sync::Arc;

use crate::clock::ManualClock;
use crate::store::{MemoryBackend, Store};

// == Strategies ==
fn valid_key_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_]{1,32}"
}

/// Generates non-null JSON payloads.
fn payload_strategy() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        any::<bool>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        "[a-zA-Z0-9 ]{0,24}".prop_map(Value::from),
    ];
    leaf.prop_recursive(3, 32, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::from),
            prop::collection::btree_map("[a-z]{1,8}", inner, 0..4)
                .prop_map(|map| Value::Object(map.into_iter().collect())),
        ]
    })
}

fn connected_store() -> Store {
    let store = Store::new("memory://");
    let backend = Arc::new(MemoryBackend::with_clock(Arc::new(ManualClock::new(0))));
    tokio_test::block_on(store.connect_with(backend));
    store
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // A stored payload reads back structurally equal.
    #[test]
    fn prop_roundtrip_storage(key in valid_key_strategy(), payload in payload_strategy()) {
        let store = connected_store();

        prop_assert!(tokio_test::block_on(store.set(&key, &payload, 60)));
        let read = tokio_test::block_on(store.get(&key));
        prop_assert_eq!(read, Some(payload));
    }

    // Clearing a prefix removes exactly the keys under it.
    #[test]
    fn prop_clear_pattern_scoped(
        inside in prop::collection::btree_set(valid_key_strategy(), 0..10),
        outside in prop::collection::btree_set(valid_key_strategy(), 0..10),
    ) {
        let store = connected_store();
        tokio_test::block_on(async {
            for key in &inside {
                store.set(&format!("tasks_by_owner:{}", key), &1, 60).await;
            }
            for key in &outside {
                store.set(&format!("users:{}", key), &1, 60).await;
            }
        });

        let removed = tokio_test::block_on(store.clear_pattern("tasks_by_owner:*"));
        prop_assert_eq!(removed, inside.len() as u64);

        for key in &outside {
            let still_there = tokio_test::block_on(store.get(&format!("users:{}", key)));
            prop_assert!(still_there.is_some());
        }
    }
}
