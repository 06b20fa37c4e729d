//! Execution trace events.
//!
//! The engine records what it does into a [`TraceSink`] only while tracing
//! is enabled; a disabled sink never constructs an event.

use std::fmt;

use cadence_foundation::{EntityId, SemanticLimit};

use crate::scheduler::EventId;

// =============================================================================
// Trace Event
// =============================================================================

/// Something observable the engine did while processing events.
#[derive(Clone, Debug, PartialEq)]
pub enum TraceEvent {
    /// An event was popped and handed to the executor.
    EventFired {
        /// Event id.
        id: EventId,
        /// Event type.
        event_type: String,
        /// Simulation time.
        time: f64,
    },
    /// A rule's trigger matched and an entity was selected for it.
    RuleMatched {
        /// Rule name.
        rule: String,
        /// Entity the rule runs against.
        entity: EntityId,
    },
    /// A rule's condition passed and its actions ran.
    RuleTriggered {
        /// Rule name.
        rule: String,
        /// Entity the rule ran against.
        entity: EntityId,
    },
    /// A rule failed on an entity.
    RuleFailed {
        /// Rule name.
        rule: String,
        /// Entity the rule ran against.
        entity: EntityId,
        /// Error message.
        message: String,
    },
    /// A bounded loop stopped at its cap.
    LimitReached {
        /// Rule name.
        rule: String,
        /// Limit that tripped.
        limit: SemanticLimit,
    },
    /// An entity was created by a rule.
    EntitySpawned {
        /// New entity.
        entity: EntityId,
    },
    /// An entity was deleted by a rule.
    EntityDespawned {
        /// Deleted entity.
        entity: EntityId,
    },
    /// The stall supervisor injected a recovery event.
    RecoveryScheduled {
        /// Event type scheduled.
        event_type: String,
        /// Recovering entity.
        source: EntityId,
        /// Its target, if known.
        target: Option<EntityId>,
    },
}

impl TraceEvent {
    /// Returns a short kind label, for filtering.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::EventFired { .. } => "event_fired",
            Self::RuleMatched { .. } => "rule_matched",
            Self::RuleTriggered { .. } => "rule_triggered",
            Self::RuleFailed { .. } => "rule_failed",
            Self::LimitReached { .. } => "limit_reached",
            Self::EntitySpawned { .. } => "entity_spawned",
            Self::EntityDespawned { .. } => "entity_despawned",
            Self::RecoveryScheduled { .. } => "recovery_scheduled",
        }
    }
}

impl fmt::Display for TraceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EventFired {
                id,
                event_type,
                time,
            } => write!(f, "event {event_type} #{id} fired at {time}"),
            Self::RuleMatched { rule, entity } => write!(f, "rule {rule} matched {entity}"),
            Self::RuleTriggered { rule, entity } => write!(f, "rule {rule} triggered on {entity}"),
            Self::RuleFailed {
                rule,
                entity,
                message,
            } => write!(f, "rule {rule} failed on {entity}: {message}"),
            Self::LimitReached { rule, limit } => write!(f, "rule {rule}: {limit}"),
            Self::EntitySpawned { entity } => write!(f, "spawned {entity}"),
            Self::EntityDespawned { entity } => write!(f, "despawned {entity}"),
            Self::RecoveryScheduled {
                event_type,
                source,
                target,
            } => match target {
                Some(target) => write!(f, "recovery {event_type} for {source} -> {target}"),
                None => write!(f, "recovery {event_type} for {source}"),
            },
        }
    }
}

// =============================================================================
// Trace Sink
// =============================================================================

/// Collects trace events between drains.
#[derive(Clone, Debug, Default)]
pub struct TraceSink {
    enabled: bool,
    events: Vec<TraceEvent>,
}

impl TraceSink {
    /// Creates a sink.
    #[must_use]
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            events: Vec::new(),
        }
    }

    /// Returns whether events are being recorded.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Turns recording on or off. Turning it off drops pending events.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.events.clear();
        }
    }

    /// Records an event built lazily, only if enabled.
    pub fn record(&mut self, event: impl FnOnce() -> TraceEvent) {
        if self.enabled {
            self.events.push(event());
        }
    }

    /// Takes every recorded event.
    pub fn drain(&mut self) -> Vec<TraceEvent> {
        std::mem::take(&mut self.events)
    }
}
