//! End-to-end combat scenarios

use cadence_engine::{ScheduleOptions, WatchdogConfig};
use cadence_foundation::{EntityId, ErrorKind, Value};
use cadence_runtime::{RunLimits, Runtime, RuntimeConfig};

use crate::ARENA;

const HERO: EntityId = EntityId::new(1);
const GOBLIN: EntityId = EntityId::new(2);

fn goblin_health(runtime: &Runtime) -> Option<&Value> {
    runtime.get_field(GOBLIN, "Health", "current")
}

#[test]
fn one_attack_lands() {
    let mut runtime = Runtime::from_json(ARENA, RuntimeConfig::new().without_watchdog()).unwrap();
    runtime.start().unwrap();
    runtime
        .schedule_event("DoAttack", 0.0, ScheduleOptions::new().with_source(HERO))
        .unwrap();

    let outcome = runtime.step().unwrap().unwrap();
    assert_eq!(outcome.report.rules_triggered, 1);
    assert_eq!(goblin_health(&runtime), Some(&Value::Int(35)));
    assert_eq!(runtime.get_field(HERO, "Health", "current"), Some(&Value::Int(100)));
    assert!(runtime.step().unwrap().is_none());
}

#[test]
fn attack_from_an_unarmed_source_does_nothing() {
    let mut runtime = Runtime::from_json(ARENA, RuntimeConfig::new().without_watchdog()).unwrap();
    runtime
        .schedule_event("DoAttack", 0.0, ScheduleOptions::new().with_source(GOBLIN))
        .unwrap();
    // The goblin fails the Attack filter, so the rule runs for the hero while
    // `attacker` still names the goblin. Its damage reads as null and the
    // modify is skipped.
    runtime.step().unwrap();
    assert_eq!(goblin_health(&runtime), Some(&Value::Int(50)));
}

#[test]
fn watchdog_restarts_a_stalled_fight() {
    let config = RuntimeConfig::new().with_watchdog(
        WatchdogConfig::default()
            .with_interval(3.0)
            .with_recovery_event("DoAttack"),
    );

    let mut runtime = Runtime::from_json(ARENA, config).unwrap();
    runtime
        .set_field(HERO, "Target", "entity", Value::Entity(GOBLIN))
        .unwrap();
    runtime.start().unwrap();

    let outcome = runtime.step().unwrap().unwrap();
    assert_eq!(outcome.event.event_type, "DoAttack");
    assert_eq!(outcome.heartbeats, 1);
    assert_eq!(goblin_health(&runtime), Some(&Value::Int(35)));

    // Each later heartbeat finds the fight stalled again until the goblin drops.
    let summary = runtime.run(RunLimits::events(10)).unwrap();
    assert_eq!(goblin_health(&runtime), Some(&Value::Int(-10)));
    assert!(summary.completed);
    assert!(!runtime.engine().watchdog().is_armed());
}

#[test]
fn unhandled_recovery_lets_an_unbounded_run_finish() {
    // No rule handles the default recovery event.
    let config = RuntimeConfig::new().with_watchdog(WatchdogConfig::default().with_interval(1.0));

    let mut runtime = Runtime::from_json(ARENA, config).unwrap();
    runtime
        .set_field(HERO, "Target", "entity", Value::Entity(GOBLIN))
        .unwrap();
    runtime.start().unwrap();

    let summary = runtime.run(RunLimits::unbounded()).unwrap();
    assert!(summary.completed);
    assert_eq!(goblin_health(&runtime), Some(&Value::Int(50)));
    assert!(!runtime.engine().watchdog().is_armed());
}

#[test]
fn time_horizon_stops_before_later_events() {
    let mut runtime = Runtime::from_json(ARENA, RuntimeConfig::new().without_watchdog()).unwrap();
    for delay in [1.0, 2.0, 3.0] {
        runtime
            .schedule_event("DoAttack", delay, ScheduleOptions::new().with_source(HERO))
            .unwrap();
    }

    let summary = runtime.run(RunLimits::unbounded().with_max_time(2.0)).unwrap();
    assert_eq!(summary.events, 2);
    assert!(summary.reached_time_limit);
    assert_eq!(goblin_health(&runtime), Some(&Value::Int(20)));
}

#[test]
fn failing_step_surfaces_context() {
    let mut runtime = Runtime::from_json(ARENA, RuntimeConfig::new().without_watchdog()).unwrap();
    runtime
        .set_field(HERO, "Attack", "damage", Value::from("lots"))
        .unwrap();
    runtime
        .schedule_event("DoAttack", 0.0, ScheduleOptions::new().with_source(HERO))
        .unwrap();

    let err = runtime.step().unwrap_err();
    assert!(matches!(err.kind, ErrorKind::TypeMismatch { .. }));
    let context = err.context.unwrap();
    assert_eq!(context.rule.as_deref(), Some("DoAttack"));
    assert_eq!(context.entity, Some(HERO));
    assert_eq!(goblin_health(&runtime), Some(&Value::Int(50)));
}
