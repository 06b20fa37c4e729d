//! Host-facing runtime for Cadence.
//!
//! This crate provides:
//! - [`Runtime`] - Module loading, lifecycle state, stepping and batch runs
//! - [`RuntimeConfig`] - Seed, watchdog, execution limits and trace settings
//! - [`Hooks`] - Lifecycle and trace subscribers, isolated from failures
//! - [`TraceBuffer`] - Ring buffer of recent execution trace records
//! - [`serialize`] - `MessagePack` and JSON encoding of world snapshots

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod hooks;
pub mod runtime;
pub mod serialize;
pub mod trace;

pub use config::{RunLimits, RuntimeConfig, TraceConfig};
pub use hooks::{HookResult, Hooks, Notification, SubscriberId};
pub use runtime::{RunSummary, Runtime, RuntimeState};
pub use trace::{TraceBuffer, TraceRecord};
