//! Rule execution.
//!
//! An [`Interpreter`] handles one popped event: it finds the rules the event
//! triggers, resolves the entities each rule runs against, evaluates
//! conditions and runs actions. A failure aborts only the current rule on
//! the current entity; the remaining rules and entities still run and the
//! failures are reported together in the [`EventReport`].

mod action;
mod eval;
pub mod native;

use cadence_foundation::{EntityId, Error, ErrorContext, Value};
use cadence_storage::World;
use indexmap::IndexMap;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, warn};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::rules::{CompiledRule, RuleSet};
use crate::scheduler::{ScheduledEvent, Scheduler};
use crate::trace::{TraceEvent, TraceSink};

// =============================================================================
// Limits
// =============================================================================

/// Caps that keep a single rule execution finite.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ExecutionLimits {
    /// Iterations a `while` action may run before it is stopped.
    pub max_while_iterations: usize,
    /// Elements a `loop` action may visit before it is stopped.
    pub max_loop_iterations: usize,
    /// Nesting depth of function calls.
    pub max_call_depth: usize,
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        Self {
            max_while_iterations: 1000,
            max_loop_iterations: 10_000,
            max_call_depth: 256,
        }
    }
}

impl ExecutionLimits {
    /// Sets the `while` cap.
    #[must_use]
    pub fn with_max_while_iterations(mut self, limit: usize) -> Self {
        self.max_while_iterations = limit;
        self
    }

    /// Sets the `loop` cap.
    #[must_use]
    pub fn with_max_loop_iterations(mut self, limit: usize) -> Self {
        self.max_loop_iterations = limit;
        self
    }

    /// Sets the call depth cap.
    #[must_use]
    pub fn with_max_call_depth(mut self, limit: usize) -> Self {
        self.max_call_depth = limit;
        self
    }
}

// =============================================================================
// Reports
// =============================================================================

/// A rule that failed on one entity.
#[derive(Debug)]
pub struct RuleFailure {
    /// Rule name.
    pub rule: String,
    /// Entity the rule was running against.
    pub entity: EntityId,
    /// What went wrong, with rule and entity context attached.
    pub error: Error,
}

/// Outcome of handling one event.
#[derive(Debug, Default)]
pub struct EventReport {
    /// Rule/entity pairs selected for execution.
    pub rules_matched: usize,
    /// Rule/entity pairs whose condition passed.
    pub rules_triggered: usize,
    /// Rule/entity pairs that failed.
    pub failures: Vec<RuleFailure>,
}

impl EventReport {
    /// Returns true if no rule failed.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }
}

// =============================================================================
// Interpreter
// =============================================================================

/// Executes rules for a single event against mutable engine state.
pub struct Interpreter<'a> {
    world: &'a mut World,
    scheduler: &'a mut Scheduler,
    rules: &'a RuleSet,
    rng: &'a mut ChaCha8Rng,
    limits: &'a ExecutionLimits,
    trace: &'a mut TraceSink,
    event: &'a ScheduledEvent,
    /// Display name of the rule being run.
    rule: String,
    /// `entity`, trigger bindings, `let` and loop variables.
    locals: IndexMap<String, Value>,
    /// Parameter scopes of active function calls, innermost last.
    frames: Vec<IndexMap<String, Value>>,
}

impl<'a> Interpreter<'a> {
    /// Creates an interpreter for one event.
    pub fn new(
        world: &'a mut World,
        scheduler: &'a mut Scheduler,
        rules: &'a RuleSet,
        rng: &'a mut ChaCha8Rng,
        limits: &'a ExecutionLimits,
        trace: &'a mut TraceSink,
        event: &'a ScheduledEvent,
    ) -> Self {
        Self {
            world,
            scheduler,
            rules,
            rng,
            limits,
            trace,
            event,
            rule: String::new(),
            locals: IndexMap::new(),
            frames: Vec::new(),
        }
    }

    /// Runs every rule the event triggers.
    pub fn run(mut self) -> EventReport {
        let mut report = EventReport::default();
        let rules = self.rules;
        let event = self.event;

        for rule in rules.rules_for(&event.event_type) {
            let name = rule.name();
            for entity in self.candidates(rule) {
                // An earlier execution may have despawned it.
                if !self.world.has_entity(entity) {
                    continue;
                }
                report.rules_matched += 1;
                self.trace.record(|| TraceEvent::RuleMatched {
                    rule: name.clone(),
                    entity,
                });

                match self.run_rule(rule, &name, entity) {
                    Ok(true) => report.rules_triggered += 1,
                    Ok(false) => {}
                    Err(error) => {
                        let error = attach_context(error, &name, &event.event_type, entity);
                        warn!(rule = %name, %entity, error = %error, "rule failed");
                        self.trace.record(|| TraceEvent::RuleFailed {
                            rule: name.clone(),
                            entity,
                            message: error.to_string(),
                        });
                        report.failures.push(RuleFailure {
                            rule: name.clone(),
                            entity,
                            error,
                        });
                    }
                }
            }
        }
        report
    }

    /// Runs one rule against one entity. Returns whether the condition
    /// passed.
    fn run_rule(
        &mut self,
        rule: &CompiledRule,
        name: &str,
        entity: EntityId,
    ) -> cadence_foundation::Result<bool> {
        self.rule.clear();
        self.rule.push_str(name);
        self.frames.clear();
        self.bind_locals(rule, entity);

        if let Some(condition) = &rule.def.condition {
            if !self.eval(condition)?.is_truthy() {
                debug!(rule = %name, %entity, "condition not met");
                return Ok(false);
            }
        }

        self.trace.record(|| TraceEvent::RuleTriggered {
            rule: name.to_string(),
            entity,
        });
        self.run_actions(&rule.def.actions)?;
        Ok(true)
    }

    /// Resets locals to `entity` plus the trigger's bindings.
    fn bind_locals(&mut self, rule: &CompiledRule, entity: EntityId) {
        self.locals.clear();
        self.locals.insert("entity".to_string(), Value::Entity(entity));
        for (local, slot) in &rule.def.trigger.bindings {
            let value = self.event_slot(slot);
            self.locals.insert(local.clone(), value);
        }
    }

    /// Reads `source`, `target` or a payload field of the current event.
    fn event_slot(&self, slot: &str) -> Value {
        match slot {
            "source" => self.event.source.into(),
            "target" => self.event.target.into(),
            field => self.event.fields.get(field).cloned().unwrap_or(Value::Null),
        }
    }

    /// Selects the entities a rule runs against.
    ///
    /// 1. A binding to the event source, if the source passes the filter.
    /// 2. A binding to the event target or a payload field holding a live
    ///    entity that passes the filter.
    /// 3. Every entity carrying the filter's components.
    /// 4. Every entity.
    fn candidates(&self, rule: &CompiledRule) -> Vec<EntityId> {
        let filter = rule.def.required_components();
        let bindings = &rule.def.trigger.bindings;

        if bindings.values().any(|slot| slot == "source") {
            if let Some(source) = self.event.source {
                if self.passes_filter(source, filter) {
                    return vec![source];
                }
            }
        }

        for slot in bindings.values().filter(|slot| *slot != "source") {
            if let Some(id) = self.event_slot(slot).as_entity() {
                if self.passes_filter(id, filter) {
                    return vec![id];
                }
            }
        }

        self.world.query(filter)
    }

    fn passes_filter(&self, entity: EntityId, filter: &[String]) -> bool {
        self.world.has_entity(entity) && filter.iter().all(|c| self.world.has_component(entity, c))
    }

    /// Interprets a value as a live entity.
    fn live_entity(&self, value: &Value) -> Option<EntityId> {
        value.as_entity().filter(|id| self.world.has_entity(*id))
    }
}

fn attach_context(error: Error, rule: &str, event: &str, entity: EntityId) -> Error {
    let mut context = error.context.clone().unwrap_or_else(ErrorContext::new);
    context.rule = Some(rule.to_string());
    context.event = Some(event.to_string());
    context.entity.get_or_insert(entity);
    error.with_context(context)
}
