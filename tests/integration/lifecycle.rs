//! Runtime lifecycle: merge between runs, reset, hooks, and bound-function queries

use std::cell::RefCell;
use std::rc::Rc;

use cadence_engine::{MergeOptions, ScheduleOptions};
use cadence_foundation::{EntityId, ErrorKind, Value};
use cadence_ir::EntityDef;
use cadence_runtime::{Notification, Runtime, RuntimeConfig, RuntimeState};

use crate::ARENA;

const HERO: EntityId = EntityId::new(1);
const GOBLIN: EntityId = EntityId::new(2);

const REGEN: &str = r#"{
    "version": "1.0",
    "module": "regen",
    "components": [
        {"name": "Health", "fields": [
            {"name": "current", "type": "integer"},
            {"name": "max", "type": "integer"},
            {"name": "regen", "type": "integer", "default": 2}
        ]}
    ],
    "rules": [{
        "id": 0,
        "name": "Regenerate",
        "trigger": {"type": "event", "event": "Regen"},
        "filter": {"components": ["Health"]},
        "condition": {"type": "binary", "op": "<",
                      "left": {"type": "field", "entity": "entity",
                               "component": "Health", "field": "current"},
                      "right": {"type": "field", "entity": "entity",
                                "component": "Health", "field": "max"}},
        "actions": [{"type": "modify", "entity": "entity",
                     "component": "Health", "field": "current",
                     "op": "add",
                     "value": {"type": "call", "function": "min", "args": [
                        {"type": "field", "entity": "entity",
                         "component": "Health", "field": "regen"},
                        {"type": "binary", "op": "-",
                         "left": {"type": "field", "entity": "entity",
                                  "component": "Health", "field": "max"},
                         "right": {"type": "field", "entity": "entity",
                                   "component": "Health", "field": "current"}}
                     ]}}]
    }],
    "functions": [],
    "initial_state": {"entities": [
        {"id": 3, "name": "shaman", "components": {"Health": {"current": 5, "max": 8}},
         "bound_functions": {
            "pick_target": {"params": [{"name": "candidates", "type": "list"}],
                            "return_type": "entity",
                            "body": {"type": "call", "function": "get",
                                     "args": [{"type": "param", "name": "candidates"},
                                              {"type": "literal", "value": 0}]},
                            "source": "pick_target(candidates) = candidates[0]"}
         }}
    ]}
}"#;

fn runtime() -> Runtime {
    Runtime::from_json(ARENA, RuntimeConfig::new().without_watchdog()).unwrap()
}

fn attack(runtime: &mut Runtime) {
    runtime
        .schedule_event("DoAttack", 0.0, ScheduleOptions::new().with_source(HERO))
        .unwrap();
    runtime.step().unwrap();
}

#[test]
fn merge_while_paused_extends_the_running_world() {
    let mut runtime = runtime();
    runtime.start().unwrap();
    attack(&mut runtime);

    let regen = cadence_ir::load_json(REGEN).unwrap();
    let err = runtime.merge(&regen, MergeOptions::new()).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::InvalidState { .. }));

    runtime.pause().unwrap();
    let report = runtime
        .merge(&regen, MergeOptions::new().with_shift_ids(true).with_merge_entities(true))
        .unwrap();
    assert_eq!(report.fields_added, 1);
    assert_eq!(report.entities_added, 1);
    runtime.resume().unwrap();

    runtime.schedule_event("Regen", 1.0, ScheduleOptions::new()).unwrap();
    runtime.step().unwrap();
    assert_eq!(runtime.get_field(GOBLIN, "Health", "current"), Some(&Value::Int(37)));
    assert_eq!(runtime.get_field(HERO, "Health", "current"), Some(&Value::Int(100)));
    let shaman = runtime.entity_by_name("shaman").unwrap();
    assert_eq!(runtime.get_field(shaman, "Health", "current"), Some(&Value::Int(7)));
    assert_eq!(runtime.modules(), ["arena".to_string(), "regen".to_string()]);
}

#[test]
fn reset_keeps_merged_rules_and_entities() {
    let mut runtime = runtime();
    let regen = cadence_ir::load_json(REGEN).unwrap();
    runtime
        .merge(&regen, MergeOptions::new().with_shift_ids(true).with_merge_entities(true))
        .unwrap();
    attack(&mut runtime);

    runtime.reset().unwrap();
    assert_eq!(runtime.state(), RuntimeState::Idle);
    assert!(runtime.current_time().abs() < f64::EPSILON);
    assert_eq!(runtime.entities(), vec![HERO, GOBLIN, EntityId::new(3)]);
    assert_eq!(runtime.get_field(GOBLIN, "Health", "current"), Some(&Value::Int(50)));
    assert_eq!(runtime.engine().rules().rule_count(), 2);
}

#[test]
fn replacing_initial_entities() {
    let mut runtime = runtime();
    let defs: Vec<EntityDef> = serde_json::from_str(
        r#"[{"id": 7, "name": "dummy", "components": {"Health": {"current": 1, "max": 1}}}]"#,
    )
    .unwrap();
    let ids = runtime.set_initial_entities(defs).unwrap();
    assert_eq!(ids, vec![EntityId::new(7)]);
    assert_eq!(runtime.entities(), vec![EntityId::new(7)]);

    runtime.reset().unwrap();
    assert_eq!(runtime.entity_by_name("dummy"), Some(EntityId::new(7)));
}

#[test]
fn bound_functions_are_introspectable() {
    let mut runtime = Runtime::from_json(REGEN, RuntimeConfig::new().without_watchdog()).unwrap();
    runtime.start().unwrap();
    let shaman = runtime.entity_by_name("shaman").unwrap();

    let functions = runtime.bound_functions(shaman);
    assert_eq!(functions.len(), 1);
    assert_eq!(functions[0].name, "pick_target");
    assert_eq!(functions[0].params[0].name, "candidates");
    assert_eq!(functions[0].source.as_deref(), Some("pick_target(candidates) = candidates[0]"));

    assert!(runtime.bound_function(shaman, "pick_target").is_ok());
    let err = runtime.bound_function(shaman, "flee").unwrap_err();
    assert!(matches!(err.kind, ErrorKind::UnknownBoundFunction { .. }));
}

#[test]
fn hooks_observe_the_whole_lifecycle() {
    let mut runtime = runtime();
    let log = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&log);
    let id = runtime.subscribe(move |n| {
        let entry = match n {
            Notification::StateChanged { from, to } => format!("{from}->{to}"),
            Notification::Merged { module, report } => {
                format!("merged {module} +{}", report.rules_added)
            }
            Notification::Step { event, .. } => format!("step {}", event.event_type),
            other => other.kind().to_string(),
        };
        sink.borrow_mut().push(entry);
        Ok(())
    });
    // A failing subscriber does not disturb the others.
    runtime.subscribe(|_| Err("unavailable".into()));

    runtime.start().unwrap();
    attack(&mut runtime);
    runtime.pause().unwrap();
    runtime
        .merge(&cadence_ir::load_json(REGEN).unwrap(), MergeOptions::new().with_shift_ids(true))
        .unwrap();
    runtime.stop();
    runtime.reset().unwrap();
    assert!(runtime.unsubscribe(id));
    runtime.start().unwrap();

    assert_eq!(
        *log.borrow(),
        [
            "idle->running",
            "step DoAttack",
            "running->paused",
            "merged regen +1",
            "paused->stopped",
            "stopped->idle",
            "reset",
        ]
    );
}
