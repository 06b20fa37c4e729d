//! Cross-layer integration tests for Cadence
//!
//! Tests that drive the runtime facade end to end.

mod combat;
mod lifecycle;

/// The two-entity combat module used across these tests.
pub const ARENA: &str = r#"{
    "version": "1.0",
    "module": "arena",
    "metadata": {"compiler": "test"},
    "components": [
        {"name": "Health", "fields": [
            {"name": "current", "type": "integer"},
            {"name": "max", "type": "integer"}
        ]},
        {"name": "Attack", "fields": [{"name": "damage", "type": "integer"}]},
        {"name": "Target", "fields": [{"name": "entity", "type": "entity"}]}
    ],
    "rules": [{
        "id": 0,
        "name": "DoAttack",
        "trigger": {"type": "event", "event": "DoAttack", "bindings": {"attacker": "source"}},
        "filter": {"components": ["Attack"]},
        "actions": [{
            "type": "modify",
            "entity": {"type": "literal", "value": 2},
            "component": "Health",
            "field": "current",
            "op": "subtract",
            "value": {"type": "field", "entity": "attacker",
                      "component": "Attack", "field": "damage"}
        }]
    }],
    "functions": [],
    "initial_state": {"entities": [
        {"id": 1, "name": "hero", "components": {
            "Health": {"current": 100, "max": 100},
            "Attack": {"damage": 15}
        }},
        {"id": 2, "name": "goblin", "components": {
            "Health": {"current": 50, "max": 50}
        }}
    ]}
}"#;
