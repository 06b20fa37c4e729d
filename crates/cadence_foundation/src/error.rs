//! Error types for the Cadence runtime.
//!
//! Uses `thiserror` for ergonomic error definition with rich context.

use std::fmt;

use thiserror::Error;

use crate::entity::EntityId;
use crate::types::FieldType;

/// The main error type for Cadence operations.
#[derive(Debug, Error)]
#[error("{kind}")]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Optional context about where the error occurred.
    pub context: Option<ErrorContext>,
}

impl Error {
    /// Creates a new error with the given kind.
    #[must_use]
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: None,
        }
    }

    /// Adds context to this error.
    #[must_use]
    pub fn with_context(mut self, context: ErrorContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Pushes a frame onto this error's context stack, creating the context
    /// if needed.
    #[must_use]
    pub fn with_frame(mut self, frame: impl Into<String>) -> Self {
        let context = self.context.take().unwrap_or_default();
        self.context = Some(context.with_frame(frame));
        self
    }

    /// Creates an invalid IR error.
    #[must_use]
    pub fn invalid_ir(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidIr(message.into()))
    }

    /// Creates an unsupported version error.
    #[must_use]
    pub fn unsupported_version(found: impl Into<String>, supported: u32) -> Self {
        Self::new(ErrorKind::UnsupportedVersion {
            found: found.into(),
            supported,
        })
    }

    /// Creates a type mismatch error.
    #[must_use]
    pub fn type_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::new(ErrorKind::TypeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        })
    }

    /// Creates an entity not found error.
    #[must_use]
    pub fn entity_not_found(id: EntityId) -> Self {
        Self::new(ErrorKind::EntityNotFound(id))
    }

    /// Creates an entity exists error.
    #[must_use]
    pub fn entity_exists(id: EntityId) -> Self {
        Self::new(ErrorKind::EntityExists(id))
    }

    /// Creates an unknown function error.
    #[must_use]
    pub fn unknown_function(name: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnknownFunction(name.into()))
    }

    /// Creates an unknown bound function error.
    #[must_use]
    pub fn unknown_bound_function(entity: EntityId, name: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnknownBoundFunction {
            entity,
            name: name.into(),
        })
    }

    /// Creates an arity mismatch error.
    #[must_use]
    pub fn arity_mismatch(
        function: impl Into<String>,
        expected: impl Into<String>,
        actual: usize,
    ) -> Self {
        Self::new(ErrorKind::ArityMismatch {
            function: function.into(),
            expected: expected.into(),
            actual,
        })
    }

    /// Creates a merge conflict error.
    #[must_use]
    pub fn merge_conflict(
        component: impl Into<String>,
        field: impl Into<String>,
        existing: FieldType,
        incoming: FieldType,
    ) -> Self {
        Self::new(ErrorKind::MergeConflict {
            component: component.into(),
            field: field.into(),
            existing,
            incoming,
        })
    }

    /// Creates an invalid state error.
    #[must_use]
    pub fn invalid_state(operation: impl Into<String>, state: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidState {
            operation: operation.into(),
            state: state.into(),
        })
    }

    /// Creates a semantic limit exceeded error.
    #[must_use]
    pub fn limit_exceeded(limit: SemanticLimit) -> Self {
        Self::new(ErrorKind::LimitExceeded(limit))
    }

    /// Creates a serialization error.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Serialization(message.into()))
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal(message.into()))
    }
}

/// Categorized error kinds for pattern matching.
#[derive(Debug, Error)]
pub enum ErrorKind {
    /// The IR document declares a major version this runtime cannot read.
    #[error("unsupported IR version {found} (supported major version: {supported})")]
    UnsupportedVersion {
        /// Version string found in the document.
        found: String,
        /// Supported major version.
        supported: u32,
    },

    /// The IR document is malformed.
    #[error("invalid IR: {0}")]
    InvalidIr(String),

    /// A merge would change the type of an existing field.
    #[error("merge conflict: {component}.{field} is {existing}, incoming declares {incoming}")]
    MergeConflict {
        /// Component owning the field.
        component: String,
        /// Conflicting field.
        field: String,
        /// Type currently registered.
        existing: FieldType,
        /// Type declared by the incoming module.
        incoming: FieldType,
    },

    /// Called function is neither a module function nor a builtin.
    #[error("unknown function: {0}")]
    UnknownFunction(String),

    /// Bound function is not attached to the entity.
    #[error("unknown bound function {name} on entity {entity:?}")]
    UnknownBoundFunction {
        /// Entity the call targeted.
        entity: EntityId,
        /// Function name requested.
        name: String,
    },

    /// Entity was not found in storage.
    #[error("entity not found: {0:?}")]
    EntityNotFound(EntityId),

    /// Entity id is already in use.
    #[error("entity already exists: {0:?}")]
    EntityExists(EntityId),

    /// Type mismatch during evaluation.
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        /// The expected type.
        expected: String,
        /// The actual type encountered.
        actual: String,
    },

    /// Wrong number of arguments to function.
    #[error("arity mismatch calling {function}: expected {expected}, got {actual}")]
    ArityMismatch {
        /// Function that was called.
        function: String,
        /// Description of expected arity.
        expected: String,
        /// Actual number of arguments.
        actual: usize,
    },

    /// Integer division or modulo by zero.
    #[error("division by zero")]
    DivisionByZero,

    /// Loop iterable did not evaluate to a list.
    #[error("value of type {0} is not iterable")]
    NotIterable(String),

    /// Semantic limit exceeded (kill switch triggered).
    #[error("limit exceeded: {0}")]
    LimitExceeded(SemanticLimit),

    /// Operation is not allowed in the runtime's current state.
    #[error("cannot {operation} while {state}")]
    InvalidState {
        /// Operation attempted.
        operation: String,
        /// Current runtime state.
        state: String,
    },

    /// Encoding or decoding failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Internal error (should not happen).
    #[error("internal error: {0}")]
    Internal(String),
}

/// Semantic limits (kill switches) that can be exceeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SemanticLimit {
    /// Maximum iterations of a single `while` action exceeded.
    MaxWhileIterations {
        /// The configured limit.
        limit: usize,
    },
    /// Maximum iterations of a single `loop` action exceeded.
    MaxLoopIterations {
        /// The configured limit.
        limit: usize,
    },
    /// Maximum nested function call depth exceeded.
    MaxCallDepth {
        /// The configured limit.
        limit: usize,
        /// Function being entered when the limit tripped.
        function: Option<String>,
    },
}

impl fmt::Display for SemanticLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MaxWhileIterations { limit } => {
                write!(f, "max while iterations ({limit}) exceeded")
            }
            Self::MaxLoopIterations { limit } => {
                write!(f, "max loop iterations ({limit}) exceeded")
            }
            Self::MaxCallDepth { limit, function } => {
                write!(f, "max call depth ({limit}) exceeded")?;
                if let Some(name) = function {
                    write!(f, " calling {name}")?;
                }
                Ok(())
            }
        }
    }
}

/// Context about where an error occurred.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// Rule being executed.
    pub rule: Option<String>,
    /// Event type being handled.
    pub event: Option<String>,
    /// Entity the error concerns.
    pub entity: Option<EntityId>,
    /// Stack of function calls, innermost last.
    pub stack: Vec<String>,
}

impl ErrorContext {
    /// Creates a new empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the rule name.
    #[must_use]
    pub fn with_rule(mut self, rule: impl Into<String>) -> Self {
        self.rule = Some(rule.into());
        self
    }

    /// Sets the event type.
    #[must_use]
    pub fn with_event(mut self, event: impl Into<String>) -> Self {
        self.event = Some(event.into());
        self
    }

    /// Sets the entity.
    #[must_use]
    pub fn with_entity(mut self, entity: EntityId) -> Self {
        self.entity = Some(entity);
        self
    }

    /// Adds a stack frame.
    #[must_use]
    pub fn with_frame(mut self, frame: impl Into<String>) -> Self {
        self.stack.push(frame.into());
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(rule) = &self.rule {
            write!(f, "in rule {rule}")?;
        }
        if let Some(event) = &self.event {
            write!(f, " handling {event}")?;
        }
        if let Some(entity) = &self.entity {
            write!(f, " on {entity}")?;
        }
        if !self.stack.is_empty() {
            writeln!(f)?;
            for frame in &self.stack {
                writeln!(f, "  in {frame}")?;
            }
        }
        Ok(())
    }
}
