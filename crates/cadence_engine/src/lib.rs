//! Event scheduling, rule execution, stall supervision, and live merge for
//! Cadence.
//!
//! This crate provides:
//! - [`Scheduler`] - Time-ordered event queue with FIFO ties and recurring events
//! - [`RuleSet`] - Loaded rules, functions and constants
//! - [`Interpreter`] - Expression evaluation and action execution for one event
//! - [`Watchdog`] - Heartbeat-driven stall detection and recovery
//! - [`merge()`] - Extending a loaded instance with another module
//! - [`Engine`] - All of the above wired around one [`World`](cadence_storage::World)

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod bound;
pub mod engine;
pub mod executor;
pub mod install;
pub mod merge;
pub mod rules;
pub mod scheduler;
pub mod trace;
pub mod watchdog;

pub use bound::BoundFunctionInfo;
pub use engine::{Engine, StepOutcome};
pub use executor::{EventReport, ExecutionLimits, Interpreter, RuleFailure};
pub use install::{InstallReport, install};
pub use merge::{MergeOptions, MergeReport, merge};
pub use rules::{CompiledRule, RuleSet};
pub use scheduler::{EventId, ScheduleOptions, ScheduledEvent, Scheduler};
pub use trace::{TraceEvent, TraceSink};
pub use watchdog::{
    CombatantHeuristic, HEARTBEAT_EVENT, HeartbeatOutcome, StallHeuristic, Watchdog, WatchdogConfig,
};
