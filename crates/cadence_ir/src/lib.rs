//! Compiled rule IR for Cadence.
//!
//! This crate provides:
//! - [`IrModule`] - The versioned module aggregate produced by the rule compiler
//! - [`Expr`] and [`Action`] - Closed sum types for expression and action trees
//! - [`load_json`], [`load_value`], [`load_msgpack`] - Validated entry points
//!
//! Loading always validates structure before deserializing, so a module that
//! reaches the engine has every required array and a compatible version.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod action;
pub mod expr;
pub mod load;
pub mod module;
pub mod validate;
pub mod version;

pub use action::{Action, ComponentInit, ModifyOp};
pub use expr::{BinaryOp, ComponentOverride, EntityRef, Expr, UnaryOp};
pub use load::{load_json, load_msgpack, load_value, to_msgpack};
pub use module::{
    BoundFunction, ComponentDef, EntityDef, FieldDef, Filter, FunctionDef, InitialState, IrModule,
    Param, RuleDef, Trigger,
};
pub use version::{SUPPORTED_MAJOR, Version};
