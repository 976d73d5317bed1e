//! Property-based tests for reconciliation against a default tree

use proptest::prelude::*;
use serde_json::{Map, Value};
use settings_store::sanitize::{plan, sanitize};
use settings_store::{MappingView, ShapeMismatchPolicy};

fn leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i64>().prop_map(Value::from),
        any::<bool>().prop_map(Value::from),
        "[a-z]{0,5}".prop_map(Value::from),
        prop::collection::vec(any::<i32>(), 0..3).prop_map(Value::from),
    ]
}

fn node() -> impl Strategy<Value = Value> {
    leaf().prop_recursive(3, 24, 4, |inner| {
        prop::collection::btree_map("[a-d]", inner, 0..4)
            .prop_map(|entries| Value::Object(entries.into_iter().collect()))
    })
}

/// Small key alphabet so live and default trees overlap often.
fn mapping_tree() -> impl Strategy<Value = Value> {
    prop::collection::btree_map("[a-d]", node(), 0..4)
        .prop_map(|entries| Value::Object(entries.into_iter().collect()))
}

fn view(tree: &Value) -> MappingView {
    match tree {
        Value::Object(map) => MappingView::new(map.clone()),
        _ => MappingView::new(Map::new()),
    }
}

/// Key structure only: every non-mapping becomes null.
fn key_shape(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), key_shape(v)))
                .collect(),
        ),
        _ => Value::Null,
    }
}

/// Leaves present on both sides must keep the live value.
fn assert_preserved(live: &Value, default: &Value, result: &Value) {
    if let (Value::Object(live), Value::Object(default), Value::Object(result)) =
        (live, default, result)
    {
        for (key, live_value) in live {
            let (Some(default_value), Some(result_value)) = (default.get(key), result.get(key))
            else {
                continue;
            };
            if !live_value.is_object() && !default_value.is_object() {
                assert_eq!(result_value, live_value, "value under '{}' changed", key);
            } else {
                assert_preserved(live_value, default_value, result_value);
            }
        }
    }
}

proptest! {
    /// A second pass finds nothing to do.
    #[test]
    fn sanitize_is_idempotent(live in mapping_tree(), default in mapping_tree()) {
        for policy in [ShapeMismatchPolicy::Keep, ShapeMismatchPolicy::ReplaceWithDefault] {
            let root = view(&live);
            sanitize(&root, &default, policy).unwrap();
            let reconciled = root.to_plain().unwrap();
            prop_assert!(plan(&reconciled, &default, policy).is_empty());
        }
    }

    /// With replacement, the result has exactly the default's key structure.
    #[test]
    fn replace_policy_matches_default_keys(live in mapping_tree(), default in mapping_tree()) {
        let root = view(&live);
        sanitize(&root, &default, ShapeMismatchPolicy::ReplaceWithDefault).unwrap();
        prop_assert_eq!(key_shape(&root.to_plain().unwrap()), key_shape(&default));
    }

    /// Values already present on both sides survive reconciliation.
    #[test]
    fn existing_values_survive(live in mapping_tree(), default in mapping_tree()) {
        let root = view(&live);
        sanitize(&root, &default, ShapeMismatchPolicy::Keep).unwrap();
        assert_preserved(&live, &default, &root.to_plain().unwrap());
    }

    /// Reconciling against itself changes nothing.
    #[test]
    fn self_reconciliation_is_empty(tree in mapping_tree()) {
        prop_assert!(plan(&tree, &tree, ShapeMismatchPolicy::Keep).is_empty());
    }
}
