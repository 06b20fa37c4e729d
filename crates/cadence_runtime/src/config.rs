//! Runtime configuration.

use cadence_engine::{ExecutionLimits, WatchdogConfig};
use cadence_foundation::{Error, Result};
use serde::{Deserialize, Serialize};

/// Configuration for a [`Runtime`](crate::Runtime).
///
/// Every field has a default, so a host can deserialize a partial JSON
/// object.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Seed of the deterministic random source behind `random` and
    /// `random_range`.
    pub seed: u64,
    /// Stall supervisor settings.
    pub watchdog: WatchdogConfig,
    /// Caps on loops and call depth within one rule execution.
    pub limits: ExecutionLimits,
    /// Execution trace settings.
    pub trace: TraceConfig,
}

impl RuntimeConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a configuration from JSON.
    ///
    /// # Errors
    ///
    /// Returns a serialization error if the JSON does not describe a
    /// configuration.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::serialization(e.to_string()))
    }

    /// Builder method to set the seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Builder method to set watchdog settings.
    #[must_use]
    pub fn with_watchdog(mut self, watchdog: WatchdogConfig) -> Self {
        self.watchdog = watchdog;
        self
    }

    /// Builder method to disable the watchdog.
    #[must_use]
    pub fn without_watchdog(mut self) -> Self {
        self.watchdog.enabled = false;
        self
    }

    /// Builder method to set execution limits.
    #[must_use]
    pub fn with_limits(mut self, limits: ExecutionLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Builder method to set trace settings.
    #[must_use]
    pub fn with_trace(mut self, trace: TraceConfig) -> Self {
        self.trace = trace;
        self
    }
}

/// Execution trace settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceConfig {
    /// Whether trace events are recorded (false = zero overhead).
    pub enabled: bool,
    /// Trace buffer size (number of records to retain).
    pub buffer_size: usize,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            buffer_size: 10_000,
        }
    }
}

impl TraceConfig {
    /// Creates a configuration with tracing enabled.
    #[must_use]
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            ..Self::default()
        }
    }

    /// Builder method to set buffer size.
    #[must_use]
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }
}

/// Bounds on a batch run.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RunLimits {
    /// Maximum events to process. `None` runs until the queue empties.
    pub max_events: Option<usize>,
    /// Simulation-time horizon. Events scheduled after it stay queued.
    pub max_time: Option<f64>,
}

impl RunLimits {
    /// No limits.
    #[must_use]
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Limits the run to `count` events.
    #[must_use]
    pub fn events(count: usize) -> Self {
        Self {
            max_events: Some(count),
            max_time: None,
        }
    }

    /// Builder method to set the event cap.
    #[must_use]
    pub fn with_max_events(mut self, count: usize) -> Self {
        self.max_events = Some(count);
        self
    }

    /// Builder method to set the time horizon.
    #[must_use]
    pub fn with_max_time(mut self, time: f64) -> Self {
        self.max_time = Some(time);
        self
    }
}
