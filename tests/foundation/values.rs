//! Integration tests for Value types
//!
//! Tests truthiness, loose equality, ordering, display, and JSON encoding.

use cadence_foundation::{EntityId, PMap, Value};
use std::collections::HashSet;

// =============================================================================
// Truthiness
// =============================================================================

#[test]
fn falsy_values() {
    for value in [
        Value::Null,
        Value::Bool(false),
        Value::Int(0),
        Value::Float(0.0),
        Value::Float(f64::NAN),
        Value::from(""),
    ] {
        assert!(!value.is_truthy(), "{value:?} should be falsy");
    }
}

#[test]
fn truthy_values() {
    for value in [
        Value::Bool(true),
        Value::Int(-1),
        Value::Float(0.5),
        Value::from("x"),
        Value::Entity(EntityId::new(0)),
        Value::from(Vec::<i64>::new()),
        Value::Map(PMap::new()),
    ] {
        assert!(value.is_truthy(), "{value:?} should be truthy");
    }
}

// =============================================================================
// Equality and Ordering
// =============================================================================

#[test]
fn strict_equality_keeps_types_apart() {
    assert_ne!(Value::Int(1), Value::Float(1.0));
    assert_eq!(Value::Float(f64::NAN), Value::Float(f64::NAN));
}

#[test]
fn loose_equality_compares_numbers_by_value() {
    assert!(Value::Int(1).loose_eq(&Value::Float(1.0)));
    assert!(!Value::Int(1).loose_eq(&Value::Float(1.5)));
    assert!(Value::Entity(EntityId::new(7)).loose_eq(&Value::Int(7)));
    assert!(Value::from(vec![1_i64, 2]).loose_eq(&Value::from(vec![1.0, 2.0])));
    assert!(!Value::from("1").loose_eq(&Value::Int(1)));
}

#[test]
fn cross_type_numeric_ordering() {
    assert!(Value::Int(2) > Value::Float(1.5));
    assert!(Value::Float(0.5) < Value::Int(1));
    assert_eq!(Value::from("a").partial_cmp(&Value::Int(1)), None);
}

#[test]
fn values_hash_consistently() {
    let set: HashSet<Value> = [Value::Int(1), Value::Int(1), Value::from("a")]
        .into_iter()
        .collect();
    assert_eq!(set.len(), 2);
}

// =============================================================================
// Conversions
// =============================================================================

#[test]
fn whole_numbers_read_as_entities() {
    assert_eq!(Value::Int(3).as_entity(), Some(EntityId::new(3)));
    assert_eq!(Value::Float(4.0).as_entity(), Some(EntityId::new(4)));
    assert_eq!(Value::Float(4.5).as_entity(), None);
    assert_eq!(Value::Int(-1).as_entity(), None);
    assert_eq!(Value::from("3").as_entity(), None);
}

#[test]
fn deep_clone_is_equal() {
    let nested = Value::from(vec![Value::from(vec![1_i64, 2]), Value::from("s")]);
    assert_eq!(nested.deep_clone(), nested);
}

#[test]
fn display() {
    assert_eq!(Value::Null.to_string(), "null");
    assert_eq!(Value::from(vec![1_i64, 2]).to_string(), "[1, 2]");
    assert_eq!(Value::Entity(EntityId::new(5)).to_string(), "Entity(5)");
}

#[test]
fn type_names() {
    assert_eq!(Value::Int(1).type_name(), "integer");
    assert_eq!(Value::Float(1.0).type_name(), "float");
    assert_eq!(Value::Null.type_name(), "null");
}

// =============================================================================
// JSON Encoding
// =============================================================================

#[test]
fn json_numbers_keep_their_kind() {
    let values: Vec<Value> = serde_json::from_str("[1, 1.0, -2, null, true]").unwrap();
    assert_eq!(
        values,
        vec![Value::Int(1), Value::Float(1.0), Value::Int(-2), Value::Null, Value::Bool(true)]
    );
}

#[test]
fn json_entity_references() {
    let value: Value = serde_json::from_str(r#"{"$entity": 12}"#).unwrap();
    assert_eq!(value, Value::Entity(EntityId::new(12)));
    assert_eq!(serde_json::to_string(&value).unwrap(), r#"{"$entity":12}"#);
}

#[test]
fn json_objects_become_maps() {
    let value: Value = serde_json::from_str(r#"{"a": 1, "b": [2]}"#).unwrap();
    let map = value.as_map().unwrap();
    assert_eq!(map.get("a"), Some(&Value::Int(1)));
    assert_eq!(map.get("b"), Some(&Value::from(vec![2_i64])));
}
