//! Integration tests for Error types
//!
//! Tests error construction, display, and context.

use cadence_foundation::{EntityId, Error, ErrorContext, ErrorKind, FieldType, SemanticLimit};

#[test]
fn messages_name_the_problem() {
    let err = Error::unknown_bound_function(EntityId::new(3), "attack");
    assert!(matches!(err.kind, ErrorKind::UnknownBoundFunction { .. }));
    assert!(err.to_string().contains("attack"));

    let err = Error::unsupported_version("2.0", 1);
    assert!(err.to_string().contains("2.0"));

    let err = Error::merge_conflict("Stats", "hp", FieldType::Integer, FieldType::String);
    let msg = err.to_string();
    assert!(msg.contains("Stats.hp"));
    assert!(msg.contains("integer") && msg.contains("string"));
}

#[test]
fn limit_messages() {
    let err = Error::limit_exceeded(SemanticLimit::MaxCallDepth {
        limit: 4,
        function: Some("fib".to_string()),
    });
    assert_eq!(err.to_string(), "limit exceeded: max call depth (4) exceeded calling fib");
}

#[test]
fn frames_accumulate_innermost_first() {
    let err = Error::new(ErrorKind::DivisionByZero)
        .with_frame("inner")
        .with_frame("outer");
    let context = err.context.unwrap();
    assert_eq!(context.stack, vec!["inner".to_string(), "outer".to_string()]);
}

#[test]
fn context_display() {
    let context = ErrorContext::new()
        .with_rule("DoAttack")
        .with_event("attack")
        .with_entity(EntityId::new(1));
    assert_eq!(context.to_string(), "in rule DoAttack handling attack on Entity(1)");
}
