//! Integration tests for persistent collections
//!
//! Tests PVec and PMap structural sharing.

use cadence_foundation::{PMap, PVec, Value};

#[test]
fn push_back_leaves_original() {
    let a: PVec<Value> = PVec::new();
    let b = a.push_back(Value::Int(1));
    assert!(a.is_empty());
    assert_eq!(b.get(0), Some(&Value::Int(1)));
}

#[test]
fn insert_leaves_original() {
    let a: PMap<String, Value> = PMap::new();
    let b = a.insert("k".to_string(), Value::Int(1));
    assert!(a.is_empty());
    assert!(b.contains_key("k"));
}

#[test]
fn overlay_prefers_other() {
    let base: PMap<String, Value> = [
        ("a".to_string(), Value::Int(1)),
        ("b".to_string(), Value::Int(2)),
    ]
    .into_iter()
    .collect();
    let top: PMap<String, Value> = [("b".to_string(), Value::Int(20))].into_iter().collect();
    let merged = base.overlay(&top);
    assert_eq!(merged.get("a"), Some(&Value::Int(1)));
    assert_eq!(merged.get("b"), Some(&Value::Int(20)));
}

#[test]
fn iteration_is_key_ordered() {
    let mut map: PMap<String, Value> = PMap::new();
    map.insert_mut("z".to_string(), Value::Null);
    map.insert_mut("a".to_string(), Value::Null);
    let keys: Vec<&String> = map.keys().collect();
    assert_eq!(keys, ["a", "z"]);
}
