//! Live merge against a running world

use cadence_engine::{MergeOptions, ScheduleOptions};
use cadence_foundation::{EntityId, ErrorKind, Value};
use serde_json::json;

use crate::{engine, lit, module};

fn base() -> cadence_engine::Engine {
    engine(module(
        json!([{"name": "Health", "fields": [
            {"name": "current", "type": "integer", "default": 10}
        ]}]),
        json!([{
            "id": 0, "name": "hurt",
            "trigger": {"type": "event", "event": "Hurt"},
            "filter": {"components": ["Health"]},
            "actions": [{"type": "modify", "entity": "entity",
                         "component": "Health", "field": "current",
                         "op": "subtract", "value": lit(json!(1))}]
        }]),
        json!([]),
        json!([{"id": 1, "components": {"Health": {}}}]),
    ))
}

fn expansion(field_type: &str) -> cadence_ir::IrModule {
    cadence_ir::load_value(json!({
        "version": "1.0",
        "module": "expansion",
        "components": [
            {"name": "Health", "fields": [
                {"name": "current", "type": field_type},
                {"name": "shield", "type": "integer", "default": 3}
            ]}
        ],
        "rules": [{
            "id": 0, "name": "heal",
            "trigger": {"type": "event", "event": "Heal"},
            "filter": {"components": ["Health"]},
            "actions": [{"type": "modify", "entity": "entity",
                         "component": "Health", "field": "current",
                         "op": "add", "value": {"type": "field", "entity": "entity",
                                                "component": "Health", "field": "shield"}}]
        }],
        "functions": [],
        "initial_state": {"entities": [
            {"id": 1, "components": {"Health": {}}},
            {"id": 5, "components": {"Health": {"current": 1}}}
        ]}
    }))
    .unwrap()
}

#[test]
fn merge_keeps_state_and_adds_behaviour() {
    let mut engine = base();
    engine.schedule("Hurt", 0.0, ScheduleOptions::new());
    engine.step();

    let report = engine
        .merge(
            &expansion("integer"),
            MergeOptions::new()
                .with_shift_ids(true)
                .with_merge_entities(true),
        )
        .unwrap();
    assert_eq!(report.fields_added, 1);
    assert_eq!(report.rules_added, 1);
    assert_eq!(report.id_offset, 1);
    assert_eq!(report.entities_added, 1);
    assert_eq!(report.entities_skipped, 1);

    let world = engine.world();
    assert_eq!(world.get_field(EntityId::new(1), "Health", "current"), Some(&Value::Int(9)));
    assert_eq!(world.get_field(EntityId::new(1), "Health", "shield"), Some(&Value::Int(3)));

    engine.schedule("Heal", 0.0, ScheduleOptions::new());
    engine.step();
    let world = engine.world();
    assert_eq!(world.get_field(EntityId::new(1), "Health", "current"), Some(&Value::Int(12)));
    assert_eq!(world.get_field(EntityId::new(5), "Health", "current"), Some(&Value::Int(4)));
}

#[test]
fn conflicting_types_are_rejected_atomically() {
    let mut engine = base();
    let err = engine.merge(&expansion("string"), MergeOptions::new()).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::MergeConflict { .. }));

    assert_eq!(engine.rules().rule_count(), 1);
    assert!(engine.world().field_default("Health", "shield").is_none());
}

#[test]
fn override_retypes_the_field() {
    let mut engine = base();
    let report = engine
        .merge(&expansion("float"), MergeOptions::new().with_override_types(true))
        .unwrap();
    assert_eq!(report.fields_retyped, 1);
    assert_eq!(
        engine.world().field_type("Health", "current"),
        Some(&cadence_foundation::FieldType::Float)
    );
    // Stored values are kept; they already fit the wider type.
    assert_eq!(
        engine.world().get_field(EntityId::new(1), "Health", "current"),
        Some(&Value::Int(10))
    );
}
