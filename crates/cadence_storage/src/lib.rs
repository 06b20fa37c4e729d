//! Entity-component storage for Cadence.
//!
//! This crate provides:
//! - [`EntityStore`] - Monotonic entity allocation and liveness
//! - [`ComponentSchema`] - Registered field types and defaults
//! - [`ComponentStore`] - Per-component field records with intersection queries
//! - [`World`] - The unified store the rule executor reads and writes
//! - [`WorldSnapshot`] - Detached, deep-copied world state for inspection

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod component;
pub mod entity;
pub mod schema;
pub mod snapshot;
pub mod world;

pub use component::{ComponentStore, Record};
pub use entity::EntityStore;
pub use schema::{ComponentSchema, FieldSchema};
pub use snapshot::{EntitySnapshot, WorldSnapshot};
pub use world::World;
