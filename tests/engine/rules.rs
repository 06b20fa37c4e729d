//! Rule matching, conditions, actions and failure isolation

use cadence_engine::{ExecutionLimits, ScheduleOptions, TraceEvent};
use cadence_foundation::{EntityId, ErrorKind, Value};
use serde_json::{Value as Json, json};

use crate::{engine, engine_with, field, lit, module, var};

fn health() -> Json {
    json!([
        {"name": "Health", "fields": [
            {"name": "current", "type": "integer", "default": 10},
            {"name": "max", "type": "integer", "default": 10}
        ]},
        {"name": "Poisoned", "fields": []}
    ])
}

fn add(entity: &str, amount: Json) -> Json {
    json!({"type": "modify", "entity": entity, "component": "Health", "field": "current",
           "op": "add", "value": amount})
}

fn hp(engine: &cadence_engine::Engine, id: u64) -> Option<&Value> {
    engine.world().get_field(EntityId::new(id), "Health", "current")
}

#[test]
fn filter_selects_every_matching_entity() {
    let mut engine = engine(module(
        health(),
        json!([{
            "trigger": {"type": "event", "event": "Tick"},
            "filter": {"components": ["Health", "Poisoned"]},
            "actions": [add("entity", lit(json!(-1)))]
        }]),
        json!([]),
        json!([
            {"id": 1, "components": {"Health": {}, "Poisoned": {}}},
            {"id": 2, "components": {"Health": {}}},
            {"id": 3, "components": {"Health": {}, "Poisoned": {}}}
        ]),
    ));
    engine.schedule("Tick", 0.0, ScheduleOptions::new());
    let outcome = engine.step().unwrap();

    assert_eq!(outcome.report.rules_triggered, 2);
    assert_eq!(hp(&engine, 1), Some(&Value::Int(9)));
    assert_eq!(hp(&engine, 2), Some(&Value::Int(10)));
    assert_eq!(hp(&engine, 3), Some(&Value::Int(9)));
}

#[test]
fn source_binding_narrows_to_the_source() {
    let mut engine = engine(module(
        health(),
        json!([{
            "trigger": {"type": "event", "event": "Heal", "bindings": {"healer": "source"}},
            "filter": {"components": ["Health"]},
            "actions": [add("healer", lit(json!(5)))]
        }]),
        json!([]),
        json!([
            {"id": 1, "components": {"Health": {}}},
            {"id": 2, "components": {"Health": {}}}
        ]),
    ));
    engine.schedule("Heal", 0.0, ScheduleOptions::new().with_source(EntityId::new(2)));
    engine.step();
    assert_eq!(hp(&engine, 1), Some(&Value::Int(10)));
    assert_eq!(hp(&engine, 2), Some(&Value::Int(15)));
}

#[test]
fn condition_gates_actions() {
    let mut engine = engine(module(
        health(),
        json!([{
            "trigger": {"type": "event", "event": "Regen"},
            "filter": {"components": ["Health"]},
            "condition": {"type": "binary", "op": "<",
                          "left": field("entity", "Health", "current"),
                          "right": field("entity", "Health", "max")},
            "actions": [add("entity", lit(json!(1)))]
        }]),
        json!([]),
        json!([
            {"id": 1, "components": {"Health": {"current": 4}}},
            {"id": 2, "components": {"Health": {}}}
        ]),
    ));
    engine.schedule("Regen", 0.0, ScheduleOptions::new());
    let outcome = engine.step().unwrap();
    assert_eq!(outcome.report.rules_matched, 2);
    assert_eq!(outcome.report.rules_triggered, 1);
    assert_eq!(hp(&engine, 1), Some(&Value::Int(5)));
}

#[test]
fn higher_priority_runs_first() {
    let mut engine = engine(module(
        health(),
        json!([
            {"name": "double", "trigger": {"type": "event", "event": "E"},
             "filter": {"components": ["Health"]},
             "actions": [{"type": "modify", "entity": "entity",
                          "component": "Health", "field": "current",
                          "op": "multiply", "value": lit(json!(2))}]},
            {"name": "increment", "priority": 5, "trigger": {"type": "event", "event": "E"},
             "filter": {"components": ["Health"]},
             "actions": [add("entity", lit(json!(1)))]}
        ]),
        json!([]),
        json!([{"id": 1, "components": {"Health": {}}}]),
    ));
    engine.schedule("E", 0.0, ScheduleOptions::new());
    engine.step();
    assert_eq!(hp(&engine, 1), Some(&Value::Int(22)));
}

#[test]
fn integer_fields_truncate_defaults_and_arithmetic() {
    let mut engine = engine(serde_json::from_str(
        r#"{
            "version": "1.0",
            "module": "truncation",
            "components": [{"name": "Stat", "fields": [
                {"name": "v", "type": "integer", "default": 3.14}
            ]}],
            "rules": [{
                "trigger": {"type": "event", "event": "Grow"},
                "filter": {"components": ["Stat"]},
                "actions": [{"type": "modify", "entity": "entity",
                             "component": "Stat", "field": "v",
                             "op": "add", "value": {"type": "literal", "value": 1.5}}]
            }],
            "functions": [],
            "initial_state": {"entities": [{"id": 1, "components": {"Stat": {}}}]}
        }"#,
    )
    .unwrap());
    let read = |engine: &cadence_engine::Engine| {
        engine
            .world()
            .get_field(EntityId::new(1), "Stat", "v")
            .cloned()
    };

    assert_eq!(read(&engine), Some(Value::Int(3)));
    engine.schedule("Grow", 0.0, ScheduleOptions::new());
    engine.step();
    assert_eq!(read(&engine), Some(Value::Int(4)));
}

#[test]
fn failing_rule_does_not_stop_the_next() {
    let mut engine = engine(module(
        health(),
        json!([
            {"name": "bad", "trigger": {"type": "event", "event": "E"},
             "filter": {"components": ["Health"]},
             "actions": [add("entity", json!({"type": "binary", "op": "modulo",
                                               "left": lit(json!(1)), "right": lit(json!(0))}))]},
            {"name": "good", "trigger": {"type": "event", "event": "E"},
             "filter": {"components": ["Health"]},
             "actions": [add("entity", lit(json!(1)))]}
        ]),
        json!([]),
        json!([{"id": 1, "components": {"Health": {}}}]),
    ));
    engine.schedule("E", 0.0, ScheduleOptions::new());
    let outcome = engine.step().unwrap();

    assert_eq!(outcome.report.failures.len(), 1);
    let failure = &outcome.report.failures[0];
    assert_eq!(failure.rule, "bad");
    assert!(matches!(failure.error.kind, ErrorKind::DivisionByZero));
    let context = failure.error.context.as_ref().unwrap();
    assert_eq!(context.event.as_deref(), Some("E"));
    assert_eq!(context.entity, Some(EntityId::new(1)));
    assert_eq!(hp(&engine, 1), Some(&Value::Int(11)));
}

#[test]
fn despawned_entities_are_skipped_later_in_the_event() {
    let mut engine = engine(module(
        health(),
        json!([
            {"priority": 1, "trigger": {"type": "event", "event": "Purge"},
             "filter": {"components": ["Poisoned"]},
             "actions": [{"type": "despawn", "entity": lit(json!(2))}]},
            {"trigger": {"type": "event", "event": "Purge"},
             "filter": {"components": ["Health"]},
             "actions": [add("entity", lit(json!(1)))]}
        ]),
        json!([]),
        json!([
            {"id": 1, "components": {"Health": {}, "Poisoned": {}}},
            {"id": 2, "components": {"Health": {}}}
        ]),
    ));
    engine.schedule("Purge", 0.0, ScheduleOptions::new());
    let outcome = engine.step().unwrap();
    assert!(!engine.world().has_entity(EntityId::new(2)));
    assert_eq!(outcome.report.rules_triggered, 2);
    assert_eq!(hp(&engine, 1), Some(&Value::Int(11)));
}

#[test]
fn let_loop_and_spawn() {
    let mut engine = engine(module(
        health(),
        json!([{
            "trigger": {"type": "event", "event": "Summon"},
            "filter": {"components": ["Poisoned"]},
            "actions": [
                {"type": "let", "name": "sizes", "value": {"type": "call", "function": "list",
                    "args": [lit(json!(1)), lit(json!(2)), lit(json!(3))]}},
                {"type": "loop", "variable": "size", "iterable": var("sizes"), "body": [
                    {"type": "spawn", "components": [
                        {"name": "Health", "fields": {"current": var("size")}}
                    ]}
                ]}
            ]
        }]),
        json!([]),
        json!([{"id": 1, "components": {"Poisoned": {}}}]),
    ));
    engine.schedule("Summon", 0.0, ScheduleOptions::new());
    engine.step();

    let spawned = engine.world().query(&["Health".to_string()]);
    let values: Vec<_> = spawned
        .iter()
        .map(|id| engine.world().get_field(*id, "Health", "current").cloned())
        .collect();
    assert_eq!(values, vec![Some(Value::Int(1)), Some(Value::Int(2)), Some(Value::Int(3))]);
}

#[test]
fn loop_over_a_scalar_fails() {
    let mut engine = engine(module(
        health(),
        json!([{
            "trigger": {"type": "event", "event": "E"},
            "filter": {"components": ["Health"]},
            "actions": [{"type": "loop", "variable": "x", "iterable": lit(json!(5)), "body": []}]
        }]),
        json!([]),
        json!([{"id": 1, "components": {"Health": {}}}]),
    ));
    engine.schedule("E", 0.0, ScheduleOptions::new());
    let outcome = engine.step().unwrap();
    assert!(matches!(outcome.report.failures[0].error.kind, ErrorKind::NotIterable(_)));
}

#[test]
fn runaway_while_stops_at_the_cap_without_failing() {
    let limits = ExecutionLimits::default().with_max_while_iterations(25);
    let mut engine = engine_with(
        module(
            health(),
            json!([{
                "trigger": {"type": "event", "event": "Spin"},
                "filter": {"components": ["Health"]},
                "actions": [{"type": "while", "condition": lit(json!(true)),
                             "body": [add("entity", lit(json!(1)))]}]
            }]),
            json!([]),
            json!([{"id": 1, "components": {"Health": {"current": 0}}}]),
        ),
        limits,
    );
    engine.trace_mut().set_enabled(true);
    engine.schedule("Spin", 0.0, ScheduleOptions::new());
    let outcome = engine.step().unwrap();

    assert!(outcome.report.is_ok());
    assert_eq!(hp(&engine, 1), Some(&Value::Int(25)));
    let limited = engine
        .trace_mut()
        .drain()
        .into_iter()
        .filter(|e| matches!(e, TraceEvent::LimitReached { .. }))
        .count();
    assert_eq!(limited, 1);
}

#[test]
fn add_and_remove_component_actions() {
    let mut engine = engine(module(
        health(),
        json!([{
            "trigger": {"type": "event", "event": "Cure"},
            "filter": {"components": ["Poisoned"]},
            "actions": [
                {"type": "remove_component", "entity": "entity", "component": "Poisoned"},
                {"type": "add_component", "entity": "entity",
                 "component": {"name": "Health", "fields": {"max": lit(json!(20))}}}
            ]
        }]),
        json!([]),
        json!([{"id": 1, "components": {"Poisoned": {}}}]),
    ));
    engine.schedule("Cure", 0.0, ScheduleOptions::new());
    engine.step();

    let world = engine.world();
    assert!(!world.has_component(EntityId::new(1), "Poisoned"));
    assert_eq!(world.get_field(EntityId::new(1), "Health", "max"), Some(&Value::Int(20)));
    assert_eq!(world.get_field(EntityId::new(1), "Health", "current"), Some(&Value::Int(10)));
}

#[test]
fn named_entities_and_constants() {
    let mut doc = module(
        health(),
        json!([{
            "trigger": {"type": "event", "event": "Boost"},
            "filter": {"components": ["Poisoned"]},
            "actions": [add("@boss", var("BOOST"))]
        }]),
        json!([]),
        json!([
            {"id": 1, "components": {"Poisoned": {}}},
            {"id": 2, "name": "boss", "components": {"Health": {}}}
        ]),
    );
    doc["constants"] = json!({"BOOST": 7});
    let mut engine = engine(doc);
    engine.schedule("Boost", 0.0, ScheduleOptions::new());
    engine.step();
    assert_eq!(hp(&engine, 2), Some(&Value::Int(17)));
}

#[test]
fn event_fields_are_visible_as_variables() {
    let mut engine = engine(module(
        health(),
        json!([{
            "trigger": {"type": "event", "event": "Damage", "bindings": {"victim": "target"}},
            "filter": {"components": ["Health"]},
            "actions": [{"type": "modify", "entity": "victim",
                         "component": "Health", "field": "current",
                         "op": "subtract", "value": var("amount")}]
        }]),
        json!([]),
        json!([
            {"id": 1, "components": {"Health": {}}},
            {"id": 2, "components": {"Health": {}}}
        ]),
    ));
    let opts = ScheduleOptions::new()
        .with_target(EntityId::new(2))
        .with_field("amount", 3);
    engine.schedule("Damage", 0.0, opts);
    engine.step();
    assert_eq!(hp(&engine, 1), Some(&Value::Int(10)));
    assert_eq!(hp(&engine, 2), Some(&Value::Int(7)));
}
