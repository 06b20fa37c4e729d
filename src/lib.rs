//! Cadence - Deterministic event-driven runtime for compiled game-rule IR
//!
//! This crate re-exports all layers of the Cadence system for convenient access.
//! For detailed documentation, see the individual layer crates.
//!
//! # Architecture
//!
//! ```text
//! Layer 4: cadence_runtime    — Lifecycle, batch runs, hooks, trace buffer
//! Layer 3: cadence_engine     — Scheduler, rule executor, watchdog, live merge
//! Layer 2: cadence_storage    — Entity-component store, snapshots
//! Layer 1: cadence_ir         — IR types, validation, loading
//! Layer 0: cadence_foundation — Core types (Value, EntityId, Error)
//! ```

pub use cadence_engine as engine;
pub use cadence_foundation as foundation;
pub use cadence_ir as ir;
pub use cadence_runtime as runtime;
pub use cadence_storage as storage;
