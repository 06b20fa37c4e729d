//! Loaded rule, function and constant tables.

use std::collections::HashMap;

use cadence_foundation::Value;
use cadence_ir::{FunctionDef, RuleDef};
use indexmap::IndexMap;
use tracing::{debug, warn};

/// A rule as held by the executor.
#[derive(Clone, Debug, PartialEq)]
pub struct CompiledRule {
    /// Numeric id.
    pub id: u64,
    /// Position in load order across every loaded module.
    pub load_index: usize,
    /// Source declaration.
    pub def: RuleDef,
}

impl CompiledRule {
    /// Returns the display name: the declared name, or `rule#<id>`.
    #[must_use]
    pub fn name(&self) -> String {
        self.def
            .name
            .clone()
            .unwrap_or_else(|| format!("rule#{}", self.id))
    }

    /// Returns the event type this rule triggers on.
    #[must_use]
    pub fn event(&self) -> &str {
        self.def.trigger.event.as_deref().unwrap_or_default()
    }
}

/// Rules, functions and constants of every loaded module.
///
/// Rules are append-only. For a given event type they are yielded by
/// descending priority, ties in load order.
#[derive(Clone, Debug, Default)]
pub struct RuleSet {
    rules: Vec<CompiledRule>,
    by_event: HashMap<String, Vec<usize>>,
    functions: IndexMap<String, FunctionDef>,
    constants: IndexMap<String, Value>,
}

impl RuleSet {
    /// Creates an empty rule set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a rule. A missing id defaults to the rule's load index.
    pub fn add_rule(&mut self, def: RuleDef) -> u64 {
        let load_index = self.rules.len();
        let id = def.id.unwrap_or(load_index as u64);
        let rule = CompiledRule {
            id,
            load_index,
            def,
        };
        debug!(rule = %rule.name(), event = rule.event(), "registered rule");

        let bucket = self.by_event.entry(rule.event().to_string()).or_default();
        bucket.push(load_index);
        self.rules.push(rule);

        let rules = &self.rules;
        bucket.sort_by(|a, b| {
            rules[*b]
                .def
                .priority
                .cmp(&rules[*a].def.priority)
                .then(a.cmp(b))
        });
        id
    }

    /// Adds a function. Returns false, keeping the earlier definition, if
    /// the name is taken.
    pub fn add_function(&mut self, def: FunctionDef) -> bool {
        if self.functions.contains_key(&def.name) {
            warn!(function = %def.name, "function already defined; keeping earlier definition");
            return false;
        }
        if crate::executor::native::is_builtin(&def.name) {
            warn!(function = %def.name, "function name is a builtin; calls resolve to the builtin");
        }
        self.functions.insert(def.name.clone(), def);
        true
    }

    /// Adds a constant. Returns false, keeping the earlier value, if the
    /// name is taken.
    pub fn add_constant(&mut self, name: impl Into<String>, value: Value) -> bool {
        let name = name.into();
        if self.constants.contains_key(&name) {
            warn!(constant = %name, "constant already defined; keeping earlier value");
            return false;
        }
        self.constants.insert(name, value);
        true
    }

    /// Iterates the rules triggered by an event type, in execution order.
    pub fn rules_for<'a>(
        &'a self,
        event_type: &str,
    ) -> impl Iterator<Item = &'a CompiledRule> + 'a {
        self.by_event
            .get(event_type)
            .into_iter()
            .flatten()
            .map(|i| &self.rules[*i])
    }

    /// Iterates every rule in load order.
    pub fn rules(&self) -> impl Iterator<Item = &CompiledRule> {
        self.rules.iter()
    }

    /// Returns the number of rules.
    #[must_use]
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Returns the largest rule id, if any rule is loaded.
    #[must_use]
    pub fn max_rule_id(&self) -> Option<u64> {
        self.rules.iter().map(|r| r.id).max()
    }

    /// Returns true if a rule with this id is loaded.
    #[must_use]
    pub fn has_rule_id(&self, id: u64) -> bool {
        self.rules.iter().any(|r| r.id == id)
    }

    /// Looks up a module function.
    #[must_use]
    pub fn function(&self, name: &str) -> Option<&FunctionDef> {
        self.functions.get(name)
    }

    /// Returns true if a module function has this name.
    #[must_use]
    pub fn has_function(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Returns the number of module functions.
    #[must_use]
    pub fn function_count(&self) -> usize {
        self.functions.len()
    }

    /// Looks up a constant.
    #[must_use]
    pub fn constant(&self, name: &str) -> Option<&Value> {
        self.constants.get(name)
    }

    /// Removes everything.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
