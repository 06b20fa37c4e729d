//! Action lists executed by rules.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::expr::{EntityRef, Expr};

/// A rule action. Actions in a list run strictly in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// Read-modify-write of a single field.
    Modify {
        /// Entity to modify.
        entity: EntityRef,
        /// Component name.
        component: String,
        /// Field name.
        field: String,
        /// How the evaluated value combines with the current one.
        #[serde(default)]
        op: ModifyOp,
        /// Operand.
        value: Expr,
    },
    /// Enqueue an event after a delay.
    Schedule {
        /// Event type.
        event: String,
        /// Delay in simulation time. Absent means zero.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        delay: Option<Expr>,
        /// Event source entity.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source: Option<Expr>,
        /// Event target entity.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target: Option<Expr>,
        /// Extra payload fields.
        #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
        fields: IndexMap<String, Expr>,
        /// Repeat interval. Present makes the event recurring.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        interval: Option<Expr>,
    },
    /// Enqueue an event with zero delay.
    Emit {
        /// Event type.
        event: String,
        /// Event source entity.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source: Option<Expr>,
        /// Event target entity.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target: Option<Expr>,
        /// Extra payload fields.
        #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
        fields: IndexMap<String, Expr>,
    },
    /// Create a new entity.
    Spawn {
        /// Components attached to the new entity.
        #[serde(default)]
        components: Vec<ComponentInit>,
    },
    /// Delete an entity.
    Despawn {
        /// Entity to delete.
        entity: EntityRef,
    },
    /// Attach a component.
    AddComponent {
        /// Entity to modify.
        entity: EntityRef,
        /// Component and initial field values.
        component: ComponentInit,
    },
    /// Detach a component.
    RemoveComponent {
        /// Entity to modify.
        entity: EntityRef,
        /// Component name.
        component: String,
    },
    /// Branch on a condition.
    Conditional {
        /// Condition.
        condition: Expr,
        /// Actions run when the condition is truthy.
        #[serde(default)]
        then_actions: Vec<Action>,
        /// Actions run otherwise.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        else_actions: Option<Vec<Action>>,
    },
    /// Run a body once per list element.
    Loop {
        /// Local bound to each element.
        variable: String,
        /// Expression that must yield a list.
        iterable: Expr,
        /// Body actions.
        #[serde(default)]
        body: Vec<Action>,
    },
    /// Bind a local for the rest of the rule execution.
    Let {
        /// Local name.
        name: String,
        /// Value expression.
        value: Expr,
    },
    /// Repeat a body while a condition holds, up to the iteration cap.
    While {
        /// Condition checked before each iteration.
        condition: Expr,
        /// Body actions.
        #[serde(default)]
        body: Vec<Action>,
    },
}

impl Action {
    /// Returns the wire name of this action kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Modify { .. } => "modify",
            Self::Schedule { .. } => "schedule",
            Self::Emit { .. } => "emit",
            Self::Spawn { .. } => "spawn",
            Self::Despawn { .. } => "despawn",
            Self::AddComponent { .. } => "add_component",
            Self::RemoveComponent { .. } => "remove_component",
            Self::Conditional { .. } => "conditional",
            Self::Loop { .. } => "loop",
            Self::Let { .. } => "let",
            Self::While { .. } => "while",
        }
    }
}

/// Modify operators.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModifyOp {
    /// Replace the current value.
    #[default]
    #[serde(alias = "=")]
    Set,
    /// Add to the current value.
    #[serde(alias = "+=")]
    Add,
    /// Subtract from the current value.
    #[serde(alias = "-=")]
    Subtract,
    /// Multiply the current value.
    #[serde(alias = "*=")]
    Multiply,
    /// Divide the current value.
    #[serde(alias = "/=")]
    Divide,
}

/// A component with initial field expressions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentInit {
    /// Component name.
    pub name: String,
    /// Field expressions; unlisted fields take registered defaults.
    #[serde(default)]
    pub fields: IndexMap<String, Expr>,
}
