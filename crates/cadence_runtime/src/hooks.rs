//! Subscriber registry for lifecycle, step and trace notifications.
//!
//! Subscribers are owned by a single runtime and dropped on teardown. A
//! subscriber that returns an error or panics is logged and skipped; it
//! never interrupts the simulation.

use std::error::Error as StdError;
use std::panic::{AssertUnwindSafe, catch_unwind};

use cadence_engine::{MergeReport, RuleFailure, ScheduledEvent};
use tracing::warn;

use crate::runtime::RuntimeState;
use crate::trace::TraceRecord;

/// What a subscriber returns.
pub type HookResult = std::result::Result<(), Box<dyn StdError + Send + Sync>>;

/// Handle returned by subscribe calls, used to unsubscribe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

/// Something a lifecycle subscriber is told about.
#[derive(Debug)]
pub enum Notification<'a> {
    /// A module was loaded.
    Loaded {
        /// Module name.
        module: &'a str,
    },
    /// A module was merged into the running instance.
    Merged {
        /// Module name.
        module: &'a str,
        /// What changed.
        report: &'a MergeReport,
    },
    /// The lifecycle state changed.
    StateChanged {
        /// Previous state.
        from: RuntimeState,
        /// New state.
        to: RuntimeState,
    },
    /// An event was processed.
    Step {
        /// The processed event.
        event: &'a ScheduledEvent,
        /// Simulation time after the step.
        time: f64,
    },
    /// A rule failed while processing the last event.
    RuleFailed {
        /// The failure.
        failure: &'a RuleFailure,
    },
    /// The queue ran dry.
    Completed {
        /// Simulation time at completion.
        time: f64,
    },
    /// The simulation was reset.
    Reset,
}

impl Notification<'_> {
    /// Returns a short kind label, for logging.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Loaded { .. } => "loaded",
            Self::Merged { .. } => "merged",
            Self::StateChanged { .. } => "state_changed",
            Self::Step { .. } => "step",
            Self::RuleFailed { .. } => "rule_failed",
            Self::Completed { .. } => "completed",
            Self::Reset => "reset",
        }
    }
}

type LifecycleHook = Box<dyn FnMut(&Notification<'_>) -> HookResult>;
type TraceHook = Box<dyn FnMut(&TraceRecord) -> HookResult>;

/// The subscriber lists of one runtime.
#[derive(Default)]
pub struct Hooks {
    next_id: u64,
    lifecycle: Vec<(SubscriberId, LifecycleHook)>,
    trace: Vec<(SubscriberId, TraceHook)>,
}

impl std::fmt::Debug for Hooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hooks")
            .field("lifecycle", &self.lifecycle.len())
            .field("trace", &self.trace.len())
            .finish()
    }
}

impl Hooks {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&mut self) -> SubscriberId {
        let id = SubscriberId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Adds a lifecycle subscriber.
    pub fn subscribe(
        &mut self,
        hook: impl FnMut(&Notification<'_>) -> HookResult + 'static,
    ) -> SubscriberId {
        let id = self.allocate();
        self.lifecycle.push((id, Box::new(hook)));
        id
    }

    /// Adds a trace subscriber.
    pub fn subscribe_trace(
        &mut self,
        hook: impl FnMut(&TraceRecord) -> HookResult + 'static,
    ) -> SubscriberId {
        let id = self.allocate();
        self.trace.push((id, Box::new(hook)));
        id
    }

    /// Removes a subscriber of either kind. Returns whether it existed.
    pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        let before = self.lifecycle.len() + self.trace.len();
        self.lifecycle.retain(|(sid, _)| *sid != id);
        self.trace.retain(|(sid, _)| *sid != id);
        before != self.lifecycle.len() + self.trace.len()
    }

    /// Returns true if any trace subscriber is registered.
    #[must_use]
    pub fn has_trace_subscribers(&self) -> bool {
        !self.trace.is_empty()
    }

    /// Returns the total number of subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lifecycle.len() + self.trace.len()
    }

    /// Returns true if nobody is subscribed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Delivers a notification to every lifecycle subscriber.
    pub fn notify(&mut self, notification: &Notification<'_>) {
        for (id, hook) in &mut self.lifecycle {
            let outcome = catch_unwind(AssertUnwindSafe(|| hook(notification)));
            report(*id, notification.kind(), outcome);
        }
    }

    /// Delivers a trace record to every trace subscriber.
    pub fn notify_trace(&mut self, record: &TraceRecord) {
        for (id, hook) in &mut self.trace {
            let outcome = catch_unwind(AssertUnwindSafe(|| hook(record)));
            report(*id, record.kind(), outcome);
        }
    }

    /// Drops every subscriber.
    pub fn clear(&mut self) {
        self.lifecycle.clear();
        self.trace.clear();
    }
}

fn report(id: SubscriberId, kind: &str, outcome: std::thread::Result<HookResult>) {
    match outcome {
        Ok(Ok(())) => {}
        Ok(Err(error)) => warn!(subscriber = id.0, kind, %error, "subscriber returned an error"),
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(ToString::to_string)
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "non-string panic payload".to_string());
            warn!(subscriber = id.0, kind, panic = %message, "subscriber panicked");
        }
    }
}
