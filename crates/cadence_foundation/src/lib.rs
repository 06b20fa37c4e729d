//! Core values, entity ids, field types, and errors for Cadence.
//!
//! This crate provides:
//! - [`Value`] - The closed variant type stored in every component field
//! - [`EntityId`] - Opaque, monotonically allocated entity identifiers
//! - [`FieldType`] - Declared component field types and write-time coercion
//! - [`Error`] - Rich error types with context
//! - Persistent collections ([`PVec`], [`PMap`])

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod collections;
pub mod entity;
pub mod error;
pub mod types;
pub mod value;

pub use collections::{PMap, PVec};
pub use entity::EntityId;
pub use error::{Error, ErrorContext, ErrorKind, SemanticLimit};
pub use types::FieldType;
pub use value::Value;

/// Result type used throughout Cadence.
pub type Result<T> = std::result::Result<T, Error>;
