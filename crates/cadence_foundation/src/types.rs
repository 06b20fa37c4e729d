//! Declared component field types.
//!
//! Field types come from the IR component definitions. They drive exactly
//! two conversions on write: integer fields truncate numbers toward zero, and
//! entity fields accept a whole number as an entity id. Everything else is
//! stored as given.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::entity::EntityId;
use crate::value::Value;

/// Type descriptor for a component field.
#[derive(Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(try_from = "repr::FieldTypeRepr", into = "repr::FieldTypeRepr")
)]
pub enum FieldType {
    /// UTF-8 string.
    String,
    /// Boolean.
    Boolean,
    /// Whole number; writes are truncated toward zero.
    Integer,
    /// Floating-point number.
    Float,
    /// Nullable entity reference.
    Entity,
    /// Homogeneous list.
    List(Box<FieldType>),
    /// String-keyed map.
    Map(Box<FieldType>, Box<FieldType>),
}

impl FieldType {
    /// Creates a list type with the given element type.
    #[must_use]
    pub fn list(element: FieldType) -> Self {
        Self::List(Box::new(element))
    }

    /// Creates a map type with the given key and value types.
    #[must_use]
    pub fn map(key: FieldType, value: FieldType) -> Self {
        Self::Map(Box::new(key), Box::new(value))
    }

    /// Parses a scalar type name as written in IR.
    ///
    /// `number` is accepted as an alias for `float`. `list` and `map` without
    /// element information default to float elements and string keys.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "string" => Some(Self::String),
            "boolean" | "bool" => Some(Self::Boolean),
            "integer" | "int" => Some(Self::Integer),
            "float" | "number" | "decimal" => Some(Self::Float),
            "entity" => Some(Self::Entity),
            "list" => Some(Self::list(Self::Float)),
            "map" => Some(Self::map(Self::String, Self::Float)),
            _ => None,
        }
    }

    /// Returns the IR name of this type's outer constructor.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Entity => "entity",
            Self::List(_) => "list",
            Self::Map(_, _) => "map",
        }
    }

    /// Returns the value a field of this type holds when no default is declared.
    #[must_use]
    pub fn zero_value(&self) -> Value {
        match self {
            Self::String => Value::from(""),
            Self::Boolean => Value::Bool(false),
            Self::Integer => Value::Int(0),
            Self::Float => Value::Float(0.0),
            Self::Entity => Value::Null,
            Self::List(_) => Value::List(crate::PVec::new()),
            Self::Map(_, _) => Value::Map(crate::PMap::new()),
        }
    }

    /// Converts a value on its way into a field of this type.
    ///
    /// Integer fields truncate floats toward zero; entity fields turn
    /// non-negative whole numbers into entity references. Values that do not
    /// need conversion are returned unchanged.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn coerce(&self, value: Value) -> Value {
        match (self, value) {
            (Self::Integer, Value::Float(n)) if n.is_finite() => Value::Int(n.trunc() as i64),
            (Self::Entity, Value::Int(n)) if n >= 0 => Value::Entity(EntityId::new(n as u64)),
            (Self::Entity, Value::Float(n)) if n >= 0.0 && n.fract() == 0.0 => {
                Value::Entity(EntityId::new(n as u64))
            }
            (_, other) => other,
        }
    }
}

impl fmt::Debug for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::List(t) => write!(f, "list<{t:?}>"),
            Self::Map(k, v) => write!(f, "map<{k:?}, {v:?}>"),
            scalar => write!(f, "{}", scalar.name()),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[cfg(feature = "serde")]
mod repr {
    use serde::{Deserialize, Serialize};

    use super::FieldType;

    /// Wire shape of a field type: a bare name or a tagged object.
    #[derive(Serialize, Deserialize)]
    #[serde(untagged)]
    pub(super) enum FieldTypeRepr {
        Name(String),
        Tagged {
            #[serde(rename = "type")]
            kind: String,
            #[serde(default, skip_serializing_if = "Option::is_none")]
            element: Option<Box<FieldTypeRepr>>,
            #[serde(default, skip_serializing_if = "Option::is_none")]
            key: Option<Box<FieldTypeRepr>>,
            #[serde(default, skip_serializing_if = "Option::is_none")]
            value: Option<Box<FieldTypeRepr>>,
        },
    }

    impl TryFrom<FieldTypeRepr> for FieldType {
        type Error = String;

        fn try_from(repr: FieldTypeRepr) -> Result<Self, Self::Error> {
            let unknown = |name: &str| format!("unknown field type: {name}");
            match repr {
                FieldTypeRepr::Name(name) => {
                    FieldType::from_name(&name).ok_or_else(|| unknown(&name))
                }
                FieldTypeRepr::Tagged {
                    kind,
                    element,
                    key,
                    value,
                } => match kind.as_str() {
                    "list" => {
                        let element = match element {
                            Some(e) => FieldType::try_from(*e)?,
                            None => FieldType::Float,
                        };
                        Ok(FieldType::list(element))
                    }
                    "map" => {
                        let key = match key {
                            Some(k) => FieldType::try_from(*k)?,
                            None => FieldType::String,
                        };
                        let value = match value {
                            Some(v) => FieldType::try_from(*v)?,
                            None => FieldType::Float,
                        };
                        Ok(FieldType::map(key, value))
                    }
                    other => FieldType::from_name(other).ok_or_else(|| unknown(other)),
                },
            }
        }
    }

    impl From<FieldType> for FieldTypeRepr {
        fn from(ty: FieldType) -> Self {
            match ty {
                FieldType::List(element) => FieldTypeRepr::Tagged {
                    kind: "list".to_string(),
                    element: Some(Box::new((*element).into())),
                    key: None,
                    value: None,
                },
                FieldType::Map(key, value) => FieldTypeRepr::Tagged {
                    kind: "map".to_string(),
                    element: None,
                    key: Some(Box::new((*key).into())),
                    value: Some(Box::new((*value).into())),
                },
                scalar => FieldTypeRepr::Name(scalar.name().to_string()),
            }
        }
    }
}
