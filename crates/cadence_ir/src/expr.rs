//! Expression trees.
//!
//! Every expression node carries a `type` discriminator on the wire. The
//! evaluator matches exhaustively over [`Expr`], so adding a node kind means
//! extending this enum and every match site.

use std::fmt;

use cadence_foundation::Value;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// An expression node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Expr {
    /// Constant value.
    Literal {
        /// The value.
        #[serde(default = "null_value")]
        value: Value,
    },
    /// Local, binding, event field or constant lookup.
    Var {
        /// Variable name. A leading `@` names an initial-state entity.
        name: String,
    },
    /// Function parameter lookup. Only valid inside a function body.
    Param {
        /// Parameter name.
        name: String,
    },
    /// Component field read.
    Field {
        /// Entity whose component is read.
        entity: EntityRef,
        /// Component name.
        component: String,
        /// Field name.
        field: String,
    },
    /// Binary operation.
    Binary {
        /// Operator.
        op: BinaryOp,
        /// Left operand.
        left: Box<Expr>,
        /// Right operand.
        right: Box<Expr>,
    },
    /// Unary operation.
    Unary {
        /// Operator.
        op: UnaryOp,
        /// Operand.
        expr: Box<Expr>,
    },
    /// Built-in or module function call.
    Call {
        /// Function name.
        function: String,
        /// Arguments, evaluated left to right.
        #[serde(default)]
        args: Vec<Expr>,
    },
    /// Conditional expression.
    If {
        /// Condition.
        condition: Box<Expr>,
        /// Value when the condition is truthy.
        then: Box<Expr>,
        /// Value otherwise.
        #[serde(rename = "else")]
        otherwise: Box<Expr>,
    },
    /// Deep-clones an entity, then applies component overrides.
    Clone {
        /// Entity to clone.
        entity: EntityRef,
        /// Overrides applied to the copy.
        #[serde(default)]
        overrides: Vec<ComponentOverride>,
    },
    /// Calls a function bound directly to an entity.
    BoundCall {
        /// Entity carrying the function.
        entity: EntityRef,
        /// Bound function name.
        function: String,
        /// Arguments, evaluated left to right.
        #[serde(default)]
        args: Vec<Expr>,
    },
}

fn null_value() -> Value {
    Value::Null
}

impl Expr {
    /// Creates a literal expression.
    #[must_use]
    pub fn literal(value: impl Into<Value>) -> Self {
        Self::Literal {
            value: value.into(),
        }
    }

    /// Creates a variable reference.
    #[must_use]
    pub fn var(name: impl Into<String>) -> Self {
        Self::Var { name: name.into() }
    }

    /// Creates a parameter reference.
    #[must_use]
    pub fn param(name: impl Into<String>) -> Self {
        Self::Param { name: name.into() }
    }

    /// Creates a field read on a named variable's entity.
    #[must_use]
    pub fn field(
        entity: impl Into<String>,
        component: impl Into<String>,
        field: impl Into<String>,
    ) -> Self {
        Self::Field {
            entity: EntityRef::Name(entity.into()),
            component: component.into(),
            field: field.into(),
        }
    }

    /// Creates a binary operation.
    #[must_use]
    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Self::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Creates a function call.
    #[must_use]
    pub fn call(function: impl Into<String>, args: Vec<Expr>) -> Self {
        Self::Call {
            function: function.into(),
            args,
        }
    }
}

/// How an expression or action names an entity.
///
/// The compiler emits a bare variable name for field reads and a nested
/// expression elsewhere; both forms are accepted in every position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityRef {
    /// A variable name, resolved like [`Expr::Var`].
    Name(String),
    /// An expression evaluating to an entity.
    Expr(Box<Expr>),
}

impl EntityRef {
    /// Creates a reference by variable name.
    #[must_use]
    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }
}

impl From<Expr> for EntityRef {
    fn from(expr: Expr) -> Self {
        Self::Expr(Box::new(expr))
    }
}

/// Field values replaced on a cloned entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentOverride {
    /// Component to override. Attached from defaults if the clone lacks it.
    pub component: String,
    /// Field expressions, evaluated in the cloning rule's scope.
    #[serde(default)]
    pub fields: IndexMap<String, Expr>,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOp {
    /// Addition, or concatenation when either side is a string.
    #[serde(alias = "+")]
    Add,
    /// Subtraction.
    #[serde(alias = "-")]
    Subtract,
    /// Multiplication.
    #[serde(alias = "*")]
    Multiply,
    /// Division.
    #[serde(alias = "/")]
    Divide,
    /// Remainder.
    #[serde(alias = "%")]
    Modulo,
    /// Equality.
    #[serde(alias = "==")]
    Eq,
    /// Inequality.
    #[serde(alias = "!=")]
    Neq,
    /// Less than.
    #[serde(alias = "<")]
    Lt,
    /// Less than or equal.
    #[serde(alias = "<=")]
    Lte,
    /// Greater than.
    #[serde(alias = ">")]
    Gt,
    /// Greater than or equal.
    #[serde(alias = ">=")]
    Gte,
    /// Short-circuit logical and.
    #[serde(alias = "&&")]
    And,
    /// Short-circuit logical or.
    #[serde(alias = "||")]
    Or,
}

impl BinaryOp {
    /// Returns the operator's symbol.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::Modulo => "%",
            Self::Eq => "==",
            Self::Neq => "!=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::And => "&&",
            Self::Or => "||",
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnaryOp {
    /// Arithmetic negation.
    #[serde(alias = "-", alias = "neg")]
    Negate,
    /// Logical not.
    #[serde(alias = "!")]
    Not,
}
