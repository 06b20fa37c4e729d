//! Stall supervisor.
//!
//! Rules that forget to schedule a follow-up event can leave a simulation with
//! live combatants and an empty queue. The watchdog is a recurring heartbeat
//! event under a reserved type: when a heartbeat pops and nothing but
//! heartbeats is pending, it asks a [`StallHeuristic`] which entities look
//! stuck and schedules a recovery event for each.
//!
//! Recovery rounds that leave the world untouched are counted. After
//! `max_unproductive_recoveries` of them in a row the watchdog gives up and
//! goes dormant, so a recovery event nobody handles cannot keep a run alive.

use cadence_foundation::{EntityId, Result, Value};
use cadence_storage::World;
use tracing::{debug, info, warn};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::scheduler::{EventId, ScheduleOptions, Scheduler};
use crate::trace::{TraceEvent, TraceSink};

/// Event type reserved for heartbeats. Rules never match it.
pub const HEARTBEAT_EVENT: &str = "__watchdog__";

// =============================================================================
// Configuration
// =============================================================================

/// Watchdog settings.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct WatchdogConfig {
    /// Master switch.
    pub enabled: bool,
    /// Heartbeat period in simulation time. Zero or less disables the watchdog.
    pub interval: f64,
    /// Event type scheduled for each stalled entity.
    pub recovery_event: String,
    /// Delay of recovery events.
    pub recovery_delay: f64,
    /// Heartbeats one `step` may consume before returning.
    pub max_consecutive_heartbeats: usize,
    /// Recovery rounds in a row without any world change before the
    /// watchdog goes dormant.
    pub max_unproductive_recoveries: usize,
    /// Component holding an entity's health.
    pub health_component: String,
    /// Health field; alive while greater than zero.
    pub health_field: String,
    /// Component holding an entity's current target.
    pub target_component: String,
    /// Target field holding an entity reference.
    pub target_field: String,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: 5.0,
            recovery_event: "attack".to_string(),
            recovery_delay: 0.001,
            max_consecutive_heartbeats: 16,
            max_unproductive_recoveries: 3,
            health_component: "Health".to_string(),
            health_field: "current".to_string(),
            target_component: "Target".to_string(),
            target_field: "entity".to_string(),
        }
    }
}

impl WatchdogConfig {
    /// Returns a disabled configuration.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Sets the heartbeat interval.
    #[must_use]
    pub fn with_interval(mut self, interval: f64) -> Self {
        self.interval = interval;
        self
    }

    /// Sets the recovery event type.
    #[must_use]
    pub fn with_recovery_event(mut self, event: impl Into<String>) -> Self {
        self.recovery_event = event.into();
        self
    }

    /// Returns true if heartbeats should be scheduled at all.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.enabled && self.interval.is_finite() && self.interval > 0.0
    }
}

// =============================================================================
// Heuristic
// =============================================================================

/// Decides which entities are stuck and need a recovery event.
pub trait StallHeuristic: Send + Sync {
    /// Returns `(source, target)` pairs to schedule recovery events for.
    fn stalled(&self, world: &World) -> Vec<(EntityId, Option<EntityId>)>;
}

/// Default heuristic: an entity is a stuck combatant if it is alive and its
/// target is a live entity that is also alive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CombatantHeuristic {
    health_component: String,
    health_field: String,
    target_component: String,
    target_field: String,
}

impl CombatantHeuristic {
    /// Builds the heuristic from the component names in `config`.
    #[must_use]
    pub fn from_config(config: &WatchdogConfig) -> Self {
        Self {
            health_component: config.health_component.clone(),
            health_field: config.health_field.clone(),
            target_component: config.target_component.clone(),
            target_field: config.target_field.clone(),
        }
    }

    fn is_alive(&self, world: &World, entity: EntityId) -> bool {
        world
            .get_field(entity, &self.health_component, &self.health_field)
            .and_then(Value::as_number)
            .is_some_and(|health| health > 0.0)
    }
}

impl Default for CombatantHeuristic {
    fn default() -> Self {
        Self::from_config(&WatchdogConfig::default())
    }
}

impl StallHeuristic for CombatantHeuristic {
    fn stalled(&self, world: &World) -> Vec<(EntityId, Option<EntityId>)> {
        let signature = [self.health_component.clone(), self.target_component.clone()];
        world
            .query(&signature)
            .into_iter()
            .filter(|id| self.is_alive(world, *id))
            .filter_map(|id| {
                let target = world
                    .get_field(id, &self.target_component, &self.target_field)?
                    .as_entity()?;
                (world.has_entity(target) && self.is_alive(world, target))
                    .then_some((id, Some(target)))
            })
            .collect()
    }
}

// =============================================================================
// Watchdog
// =============================================================================

/// What a heartbeat did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HeartbeatOutcome {
    /// Other events are pending; nothing to do.
    Idle,
    /// Nothing pending and nobody stuck; the heartbeat was cancelled.
    Dormant,
    /// Earlier recoveries changed nothing; the heartbeat was cancelled.
    Exhausted,
    /// Recovery events were scheduled for this many entities.
    Recovered(usize),
}

/// The stall supervisor.
pub struct Watchdog {
    config: WatchdogConfig,
    heuristic: Box<dyn StallHeuristic>,
    heartbeat: Option<EventId>,
    unproductive: usize,
}

impl std::fmt::Debug for Watchdog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Watchdog")
            .field("config", &self.config)
            .field("heartbeat", &self.heartbeat)
            .field("unproductive", &self.unproductive)
            .finish_non_exhaustive()
    }
}

impl Watchdog {
    /// Creates a watchdog using the default combatant heuristic.
    #[must_use]
    pub fn new(config: WatchdogConfig) -> Self {
        let heuristic = Box::new(CombatantHeuristic::from_config(&config));
        Self {
            config,
            heuristic,
            heartbeat: None,
            unproductive: 0,
        }
    }

    /// Replaces the stall heuristic.
    #[must_use]
    pub fn with_heuristic(mut self, heuristic: impl StallHeuristic + 'static) -> Self {
        self.heuristic = Box::new(heuristic);
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &WatchdogConfig {
        &self.config
    }

    /// Returns the pending heartbeat's id, if armed.
    #[must_use]
    pub fn heartbeat(&self) -> Option<EventId> {
        self.heartbeat
    }

    /// Returns true if a heartbeat is scheduled.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.heartbeat.is_some()
    }

    /// Schedules the recurring heartbeat unless disabled or already armed.
    ///
    /// # Errors
    ///
    /// Propagates scheduler errors.
    pub fn arm(&mut self, scheduler: &mut Scheduler) -> Result<()> {
        if !self.config.is_active() || self.heartbeat.is_some() {
            return Ok(());
        }
        let id = scheduler.schedule_recurring(
            HEARTBEAT_EVENT,
            self.config.interval,
            ScheduleOptions::new(),
        )?;
        debug!(id, interval = self.config.interval, "watchdog armed");
        self.heartbeat = Some(id);
        self.unproductive = 0;
        Ok(())
    }

    /// Returns how many recovery rounds in a row changed nothing.
    #[must_use]
    pub fn unproductive_recoveries(&self) -> usize {
        self.unproductive
    }

    /// Records that an event changed the world, which clears the count of
    /// unproductive recoveries.
    pub fn note_progress(&mut self) {
        self.unproductive = 0;
    }

    /// Cancels the heartbeat.
    pub fn disarm(&mut self, scheduler: &mut Scheduler) {
        if let Some(id) = self.heartbeat.take() {
            scheduler.cancel(id);
            debug!(id, "watchdog disarmed");
        }
    }

    /// Forgets the heartbeat without touching the scheduler, for when the
    /// queue itself was reset.
    pub fn forget(&mut self) {
        self.heartbeat = None;
        self.unproductive = 0;
    }

    /// Handles a popped heartbeat.
    pub fn on_heartbeat(
        &mut self,
        world: &World,
        scheduler: &mut Scheduler,
        trace: &mut TraceSink,
    ) -> HeartbeatOutcome {
        if scheduler.has_pending_except(HEARTBEAT_EVENT) {
            return HeartbeatOutcome::Idle;
        }

        let stalled = self.heuristic.stalled(world);
        if stalled.is_empty() {
            debug!(time = scheduler.current_time(), "no pending work and no stalled entities");
            self.disarm(scheduler);
            return HeartbeatOutcome::Dormant;
        }
        if self.unproductive >= self.config.max_unproductive_recoveries {
            warn!(
                rounds = self.unproductive,
                event = %self.config.recovery_event,
                "recovery events changed nothing; watchdog going dormant"
            );
            self.disarm(scheduler);
            return HeartbeatOutcome::Exhausted;
        }
        self.unproductive += 1;

        for (source, target) in &stalled {
            let mut opts = ScheduleOptions::new().with_source(*source);
            opts.target = *target;
            scheduler.schedule(&self.config.recovery_event, self.config.recovery_delay, opts);
            trace.record(|| TraceEvent::RecoveryScheduled {
                event_type: self.config.recovery_event.clone(),
                source: *source,
                target: *target,
            });
        }
        info!(
            count = stalled.len(),
            event = %self.config.recovery_event,
            time = scheduler.current_time(),
            "stall detected; scheduled recovery events"
        );
        HeartbeatOutcome::Recovered(stalled.len())
    }
}
