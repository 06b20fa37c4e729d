//! Integration tests for Layer 3: Engine
//!
//! Tests for scheduling, rule execution, functions, live merge, and the watchdog.

mod merging;
mod rules;
mod scheduling;
mod watchdog;

use cadence_engine::{Engine, ExecutionLimits, WatchdogConfig};
use serde_json::{Value as Json, json};

/// Builds a module document from its parts.
pub fn module(components: Json, rules: Json, functions: Json, entities: Json) -> Json {
    json!({
        "version": "1.0",
        "module": "test",
        "components": components,
        "rules": rules,
        "functions": functions,
        "initial_state": {"entities": entities}
    })
}

/// Creates an engine with the watchdog off and the module installed.
pub fn engine(module: Json) -> Engine {
    engine_with(module, ExecutionLimits::default())
}

/// Like [`engine`], with custom execution limits.
pub fn engine_with(module: Json, limits: ExecutionLimits) -> Engine {
    let mut engine = Engine::new(7, limits, WatchdogConfig::disabled());
    engine
        .install(&cadence_ir::load_value(module).unwrap())
        .unwrap();
    engine
}

/// Shorthand for a literal expression.
pub fn lit(value: Json) -> Json {
    json!({"type": "literal", "value": value})
}

/// Shorthand for a variable expression.
pub fn var(name: &str) -> Json {
    json!({"type": "var", "name": name})
}

/// Shorthand for a field read.
pub fn field(entity: &str, component: &str, name: &str) -> Json {
    json!({"type": "field", "entity": entity, "component": component, "field": name})
}
