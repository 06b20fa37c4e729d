//! Scheduler ordering and the schedule/emit actions

use cadence_engine::{ScheduleOptions, Scheduler};
use cadence_foundation::{EntityId, Value};
use serde_json::json;

use crate::{engine, lit, module};

#[test]
fn equal_times_pop_in_insertion_order() {
    let mut scheduler = Scheduler::new();
    scheduler.schedule("b", 1.0, ScheduleOptions::new());
    scheduler.schedule("a", 0.5, ScheduleOptions::new());
    scheduler.schedule("c", 1.0, ScheduleOptions::new());
    scheduler.schedule_immediate("now", ScheduleOptions::new());

    let order: Vec<String> = std::iter::from_fn(|| scheduler.pop()).map(|e| e.event_type).collect();
    assert_eq!(order, ["now", "a", "b", "c"]);
}

#[test]
fn time_never_moves_backward() {
    let mut scheduler = Scheduler::new();
    scheduler.schedule("x", 5.0, ScheduleOptions::new());
    scheduler.pop();
    scheduler.schedule_at("past", 1.0, ScheduleOptions::new());
    scheduler.schedule("negative", -3.0, ScheduleOptions::new());

    let past = scheduler.pop().unwrap();
    assert!((past.time - 5.0).abs() < f64::EPSILON);
    let negative = scheduler.pop().unwrap();
    assert!((negative.time - 5.0).abs() < f64::EPSILON);
}

#[test]
fn recurring_keeps_its_id_until_cancelled() {
    let mut scheduler = Scheduler::new();
    let id = scheduler.schedule_recurring("beat", 2.0, ScheduleOptions::new()).unwrap();
    for expected in [2.0, 4.0, 6.0] {
        let event = scheduler.pop().unwrap();
        assert_eq!(event.id, id);
        assert!((event.time - expected).abs() < f64::EPSILON);
    }
    assert!(scheduler.cancel(id));
    assert!(scheduler.pop().is_none());
}

#[test]
fn recurring_rejects_non_positive_intervals() {
    let mut scheduler = Scheduler::new();
    assert!(scheduler.schedule_recurring("x", 0.0, ScheduleOptions::new()).is_err());
    assert!(scheduler.schedule_recurring("x", f64::NAN, ScheduleOptions::new()).is_err());
    assert!(scheduler.is_empty());
}

#[test]
fn schedule_action_carries_source_target_and_fields() {
    let mut engine = engine(module(
        json!([]),
        json!([{
            "name": "relay",
            "trigger": {"type": "event", "event": "Start", "bindings": {"sender": "source"}},
            "actions": [{
                "type": "schedule", "event": "Next", "delay": lit(json!(1.5)),
                "source": {"type": "var", "name": "source"},
                "target": lit(json!(2)),
                "fields": {"amount": lit(json!(4))}
            }]
        }]),
        json!([]),
        json!([{"id": 1}, {"id": 2}]),
    ));
    engine.schedule("Start", 0.0, ScheduleOptions::new().with_source(EntityId::new(1)));
    engine.step().unwrap();

    let next = engine.scheduler().peek().unwrap();
    assert_eq!(next.event_type, "Next");
    assert!((next.time - 1.5).abs() < f64::EPSILON);
    assert_eq!(next.source, Some(EntityId::new(1)));
    assert_eq!(next.target, Some(EntityId::new(2)));
    assert_eq!(next.fields.get("amount"), Some(&Value::Int(4)));
}

#[test]
fn schedule_to_a_dead_target_is_dropped() {
    let mut engine = engine(module(
        json!([]),
        json!([{
            "trigger": {"type": "event", "event": "Start"},
            "actions": [{"type": "emit", "event": "Hit", "target": lit(json!(99))}]
        }]),
        json!([]),
        json!([{"id": 1}]),
    ));
    engine.schedule("Start", 0.0, ScheduleOptions::new());
    let outcome = engine.step().unwrap();
    assert!(outcome.report.is_ok());
    assert!(engine.scheduler().is_empty());
}

#[test]
fn schedule_action_with_interval_recurs() {
    let mut engine = engine(module(
        json!([]),
        json!([{
            "trigger": {"type": "event", "event": "Start"},
            "actions": [{"type": "schedule", "event": "Tick",
                         "delay": lit(json!(1)), "interval": lit(json!(3))}]
        }]),
        json!([]),
        json!([{"id": 1}]),
    ));
    engine.schedule("Start", 0.0, ScheduleOptions::new());
    engine.step();

    let first = engine.step().unwrap();
    let second = engine.step().unwrap();
    assert_eq!(first.event.id, second.event.id);
    assert!((first.time - 1.0).abs() < f64::EPSILON);
    assert!((second.time - 4.0).abs() < f64::EPSILON);
}
