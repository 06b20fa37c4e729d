//! Stall detection and recovery through the engine step loop

use cadence_engine::{
    Engine, ExecutionLimits, HEARTBEAT_EVENT, ScheduleOptions, StallHeuristic, Watchdog,
    WatchdogConfig,
};
use cadence_foundation::{EntityId, Value};
use cadence_storage::World;
use serde_json::json;

use crate::{field, lit, module};

fn combat(config: WatchdogConfig) -> Engine {
    let doc = module(
        json!([
            {"name": "Health", "fields": [{"name": "current", "type": "integer"}]},
            {"name": "Target", "fields": [{"name": "entity", "type": "entity"}]}
        ]),
        json!([{
            "name": "strike",
            "trigger": {"type": "event", "event": "attack", "bindings": {"attacker": "source"}},
            "filter": {"components": ["Health", "Target"]},
            "actions": [{
                "type": "modify",
                "entity": field("attacker", "Target", "entity"),
                "component": "Health",
                "field": "current",
                "op": "subtract",
                "value": lit(json!(4))
            }]
        }]),
        json!([]),
        json!([
            {"id": 1, "components": {"Health": {"current": 20}, "Target": {"entity": 2}}},
            {"id": 2, "components": {"Health": {"current": 20}}}
        ]),
    );
    let mut engine = Engine::new(0, ExecutionLimits::default(), config);
    engine.install(&cadence_ir::load_value(doc).unwrap()).unwrap();
    engine
}

fn target_health(engine: &Engine) -> Option<&Value> {
    engine.world().get_field(EntityId::new(2), "Health", "current")
}

#[test]
fn stalled_combat_is_recovered() {
    let mut engine = combat(WatchdogConfig::default().with_interval(2.0));
    engine.arm_watchdog().unwrap();

    // The heartbeat finds nothing pending, schedules a recovery attack, and
    // the same step goes on to process it.
    let outcome = engine.step().unwrap();
    assert_eq!(outcome.heartbeats, 1);
    assert_eq!(outcome.event.event_type, "attack");
    assert_eq!(outcome.event.source, Some(EntityId::new(1)));
    assert_eq!(outcome.event.target, Some(EntityId::new(2)));
    assert!((outcome.time - 2.001).abs() < 1e-9);
    assert_eq!(target_health(&engine), Some(&Value::Int(16)));
    assert!(engine.watchdog().is_armed());
}

#[test]
fn pending_work_keeps_heartbeats_idle() {
    let mut engine = combat(WatchdogConfig::default().with_interval(1.0));
    engine.schedule("Later", 10.0, ScheduleOptions::new());
    engine.arm_watchdog().unwrap();

    let outcome = engine.step().unwrap();
    assert_eq!(outcome.event.event_type, "Later");
    assert_eq!(outcome.heartbeats, 9);
    assert_eq!(target_health(&engine), Some(&Value::Int(20)));
}

#[test]
fn unhandled_recovery_event_gives_up() {
    let config = WatchdogConfig::default()
        .with_interval(1.0)
        .with_recovery_event("shout");
    let mut engine = combat(config);
    engine.arm_watchdog().unwrap();

    let mut shouts = 0;
    let mut steps = 0;
    while let Some(outcome) = engine.step() {
        steps += 1;
        assert!(steps <= 10, "watchdog kept recovering");
        if outcome.event.event_type == "shout" {
            shouts += 1;
        }
    }

    assert_eq!(shouts, 3);
    assert_eq!(target_health(&engine), Some(&Value::Int(20)));
    assert!(!engine.watchdog().is_armed());
}

#[test]
fn no_combatants_means_dormant() {
    let mut engine = combat(WatchdogConfig::default());
    engine
        .world_mut()
        .set_field(EntityId::new(2), "Health", "current", Value::Int(0))
        .unwrap();
    engine.arm_watchdog().unwrap();

    let outcome = engine.step().unwrap();
    assert!(outcome.is_heartbeat());
    assert!(!engine.watchdog().is_armed());
    assert!(engine.step().is_none());
}

#[test]
fn disabled_watchdog_never_schedules() {
    let mut engine = combat(WatchdogConfig::default().with_interval(0.0));
    engine.arm_watchdog().unwrap();
    assert!(!engine.scheduler().has_pending(HEARTBEAT_EVENT));
    assert!(engine.step().is_none());
}

struct Everyone;

impl StallHeuristic for Everyone {
    fn stalled(&self, world: &World) -> Vec<(EntityId, Option<EntityId>)> {
        world.entities().map(|id| (id, None)).collect()
    }
}

#[test]
fn custom_heuristic_and_recovery_event() {
    let mut engine = combat(WatchdogConfig::default());
    let config = WatchdogConfig::default().with_recovery_event("nudge");
    engine.set_watchdog(Watchdog::new(config).with_heuristic(Everyone));
    engine.arm_watchdog().unwrap();

    let outcome = engine.step().unwrap();
    assert_eq!(outcome.event.event_type, "nudge");
    assert!(engine.scheduler().has_pending("nudge"));
}
