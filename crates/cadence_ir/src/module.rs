//! The IR module aggregate and its declarations.

use cadence_foundation::{FieldType, Value};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::action::Action;
use crate::expr::Expr;

/// A compiled rule module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IrModule {
    /// Format version, `MAJOR.MINOR`.
    pub version: String,
    /// Module name.
    pub module: String,
    /// Compiler metadata. Carried through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    /// Component declarations.
    #[serde(default)]
    pub components: Vec<ComponentDef>,
    /// Rules in load order.
    #[serde(default)]
    pub rules: Vec<RuleDef>,
    /// Module functions.
    #[serde(default)]
    pub functions: Vec<FunctionDef>,
    /// Legacy tracker declarations. Accepted and ignored.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub trackers: Vec<serde_json::Value>,
    /// Named constants, visible to every rule.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub constants: IndexMap<String, Value>,
    /// Entities created on load.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_state: Option<InitialState>,
    /// Choice-function metadata for tooling.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choice_functions: Vec<serde_json::Value>,
    /// Choice-point metadata for tooling.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choice_points: Vec<serde_json::Value>,
    /// Source files the module was compiled from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_map: Option<serde_json::Value>,
}

impl IrModule {
    /// Creates an empty module with the current format version.
    #[must_use]
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            version: format!("{}.0", crate::version::SUPPORTED_MAJOR),
            module: module.into(),
            metadata: None,
            components: Vec::new(),
            rules: Vec::new(),
            functions: Vec::new(),
            trackers: Vec::new(),
            constants: IndexMap::new(),
            initial_state: None,
            choice_functions: Vec::new(),
            choice_points: Vec::new(),
            source_map: None,
        }
    }

    /// Returns the initial entities, if any.
    #[must_use]
    pub fn initial_entities(&self) -> &[EntityDef] {
        self.initial_state
            .as_ref()
            .map_or(&[], |state| state.entities.as_slice())
    }

    /// Looks up a component declaration by name.
    #[must_use]
    pub fn component(&self, name: &str) -> Option<&ComponentDef> {
        self.components.iter().find(|c| c.name == name)
    }
}

/// A component declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentDef {
    /// Numeric id assigned by the compiler.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    /// Component name.
    pub name: String,
    /// Field declarations.
    pub fields: Vec<FieldDef>,
}

/// A component field declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    /// Field name.
    pub name: String,
    /// Declared type.
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Default value. Absent means the type's zero value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

/// A rule declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDef {
    /// Numeric id. Defaults to the rule's load index.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Event trigger.
    pub trigger: Trigger,
    /// Required components.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Filter>,
    /// Per-entity guard.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Expr>,
    /// Higher priorities run first for the same event.
    #[serde(default)]
    pub priority: i32,
    /// Ordered actions.
    pub actions: Vec<Action>,
}

impl RuleDef {
    /// Returns the required component names.
    #[must_use]
    pub fn required_components(&self) -> &[String] {
        self.filter
            .as_ref()
            .map_or(&[], |filter| filter.components.as_slice())
    }
}

/// What makes a rule fire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trigger {
    /// Trigger kind. Only `event` triggers exist today.
    #[serde(rename = "type")]
    pub kind: String,
    /// Event type matched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    /// Local name to event slot (`source`, `target` or a payload field).
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub bindings: IndexMap<String, String>,
}

impl Trigger {
    /// Creates an event trigger.
    #[must_use]
    pub fn event(event: impl Into<String>) -> Self {
        Self {
            kind: "event".to_string(),
            event: Some(event.into()),
            bindings: IndexMap::new(),
        }
    }

    /// Adds a binding.
    #[must_use]
    pub fn with_binding(mut self, local: impl Into<String>, slot: impl Into<String>) -> Self {
        self.bindings.insert(local.into(), slot.into());
        self
    }
}

/// Components an entity must carry for a rule to consider it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    /// Component names.
    #[serde(default)]
    pub components: Vec<String>,
}

/// A module function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDef {
    /// Numeric id assigned by the compiler.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    /// Function name.
    pub name: String,
    /// Parameters.
    #[serde(default)]
    pub params: Vec<Param>,
    /// Declared return type. Informational.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_type: Option<FieldType>,
    /// Body expression.
    pub body: Expr,
}

/// A function parameter: a bare name or `{name, type}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ParamRepr", into = "ParamRepr")]
pub struct Param {
    /// Parameter name.
    pub name: String,
    /// Declared type. Informational.
    pub param_type: Option<FieldType>,
}

impl Param {
    /// Creates an untyped parameter.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            param_type: None,
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum ParamRepr {
    Name(String),
    Typed {
        name: String,
        #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
        param_type: Option<FieldType>,
    },
}

impl From<ParamRepr> for Param {
    fn from(repr: ParamRepr) -> Self {
        match repr {
            ParamRepr::Name(name) => Self::new(name),
            ParamRepr::Typed { name, param_type } => Self { name, param_type },
        }
    }
}

impl From<Param> for ParamRepr {
    fn from(param: Param) -> Self {
        Self::Typed {
            name: param.name,
            param_type: param.param_type,
        }
    }
}

/// Entities created on load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InitialState {
    /// Entity definitions.
    #[serde(default)]
    pub entities: Vec<EntityDef>,
}

/// An initial entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDef {
    /// Explicit id. Absent means allocate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    /// Name usable as `@name` in rules.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Component name to field values.
    #[serde(default)]
    pub components: IndexMap<String, IndexMap<String, Value>>,
    /// Per-entity decision functions.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub bound_functions: IndexMap<String, BoundFunction>,
}

/// A function attached to a single entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundFunction {
    /// Parameters.
    #[serde(default)]
    pub params: Vec<Param>,
    /// Declared return type. Informational.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_type: Option<FieldType>,
    /// Body expression.
    pub body: Expr,
    /// Original source text, for display only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}
