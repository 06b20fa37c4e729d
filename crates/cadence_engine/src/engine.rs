//! The engine: world, queue, rules and watchdog driven one event at a time.

use cadence_foundation::{EntityId, Result};
use cadence_ir::{EntityDef, IrModule};
use cadence_storage::World;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, trace};

use crate::executor::{EventReport, ExecutionLimits, Interpreter};
use crate::install::{self, InstallReport};
use crate::merge::{self, MergeOptions, MergeReport};
use crate::rules::RuleSet;
use crate::scheduler::{EventId, ScheduleOptions, ScheduledEvent, Scheduler};
use crate::trace::{TraceEvent, TraceSink};
use crate::watchdog::{HEARTBEAT_EVENT, Watchdog, WatchdogConfig};

/// Result of one [`Engine::step`].
#[derive(Debug)]
pub struct StepOutcome {
    /// The event that was processed. A heartbeat only when the heartbeat
    /// cap was reached or nothing else was left.
    pub event: ScheduledEvent,
    /// Simulation time after the step.
    pub time: f64,
    /// What the rules did.
    pub report: EventReport,
    /// Heartbeats consumed during this step.
    pub heartbeats: usize,
}

impl StepOutcome {
    /// Returns true if the processed event is a watchdog heartbeat.
    #[must_use]
    pub fn is_heartbeat(&self) -> bool {
        self.event.event_type == HEARTBEAT_EVENT
    }
}

/// Single-threaded simulation core.
#[derive(Debug)]
pub struct Engine {
    world: World,
    scheduler: Scheduler,
    rules: RuleSet,
    rng: ChaCha8Rng,
    seed: u64,
    limits: ExecutionLimits,
    watchdog: Watchdog,
    trace: TraceSink,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(0, ExecutionLimits::default(), WatchdogConfig::default())
    }
}

impl Engine {
    /// Creates an empty engine.
    #[must_use]
    pub fn new(seed: u64, limits: ExecutionLimits, watchdog: WatchdogConfig) -> Self {
        Self {
            world: World::new(),
            scheduler: Scheduler::new(),
            rules: RuleSet::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
            limits,
            watchdog: Watchdog::new(watchdog),
            trace: TraceSink::default(),
        }
    }

    /// Replaces the watchdog, for example to install a custom heuristic.
    /// A pending heartbeat of the old watchdog is cancelled.
    pub fn set_watchdog(&mut self, watchdog: Watchdog) {
        self.watchdog.disarm(&mut self.scheduler);
        self.watchdog = watchdog;
    }

    // =========================================================================
    // Loading
    // =========================================================================

    /// Installs a module into empty or existing tables.
    ///
    /// # Errors
    ///
    /// Returns an error if an initial entity cannot be created.
    pub fn install(&mut self, module: &IrModule) -> Result<InstallReport> {
        install::install(module, &mut self.world, &mut self.rules)
    }

    /// Merges an additional module.
    ///
    /// # Errors
    ///
    /// Returns `MergeConflict` on an incompatible field redeclaration.
    pub fn merge(&mut self, module: &IrModule, options: MergeOptions) -> Result<MergeReport> {
        merge::merge(module, &mut self.world, &mut self.rules, options)
    }

    /// Creates entities from definitions.
    ///
    /// # Errors
    ///
    /// Returns `EntityExists` if an explicit id is already live.
    pub fn spawn_entities(&mut self, defs: &[EntityDef]) -> Result<Vec<EntityId>> {
        install::spawn_entities(&mut self.world, defs)
    }

    // =========================================================================
    // Scheduling
    // =========================================================================

    /// Schedules an event `delay` from now.
    pub fn schedule(
        &mut self,
        event_type: impl Into<String>,
        delay: f64,
        opts: ScheduleOptions,
    ) -> EventId {
        self.scheduler.schedule(event_type, delay, opts)
    }

    /// Cancels a pending event.
    pub fn cancel(&mut self, id: EventId) -> bool {
        if self.watchdog.heartbeat() == Some(id) {
            self.watchdog.disarm(&mut self.scheduler);
            return true;
        }
        self.scheduler.cancel(id)
    }

    /// Schedules the watchdog heartbeat if it is enabled and not pending.
    ///
    /// # Errors
    ///
    /// Propagates scheduler errors.
    pub fn arm_watchdog(&mut self) -> Result<()> {
        self.watchdog.arm(&mut self.scheduler)
    }

    /// Cancels the watchdog heartbeat.
    pub fn disarm_watchdog(&mut self) {
        self.watchdog.disarm(&mut self.scheduler);
    }

    // =========================================================================
    // Stepping
    // =========================================================================

    /// Pops and processes the next event. Returns `None` if the queue is
    /// empty.
    ///
    /// Heartbeats are handled here rather than by rules. Up to
    /// `max_consecutive_heartbeats` of them are consumed before a real event
    /// is processed; once the cap is reached the last heartbeat is returned.
    /// An event that changes the world counts as progress for the watchdog.
    pub fn step(&mut self) -> Option<StepOutcome> {
        let cap = self.watchdog.config().max_consecutive_heartbeats.max(1);
        let mut heartbeats = 0;

        loop {
            let event = self.scheduler.pop()?;
            self.trace.record(|| TraceEvent::EventFired {
                id: event.id,
                event_type: event.event_type.clone(),
                time: event.time,
            });

            if event.event_type == HEARTBEAT_EVENT {
                heartbeats += 1;
                let outcome = self
                    .watchdog
                    .on_heartbeat(&self.world, &mut self.scheduler, &mut self.trace);
                trace!(?outcome, time = event.time, "heartbeat");
                if heartbeats >= cap || self.scheduler.is_empty() {
                    return Some(StepOutcome {
                        time: self.scheduler.current_time(),
                        event,
                        report: EventReport::default(),
                        heartbeats,
                    });
                }
                continue;
            }

            let revision = self.world.revision();
            let report = self.process(&event);
            if self.world.revision() != revision {
                self.watchdog.note_progress();
            }
            debug!(
                event = %event.event_type,
                id = event.id,
                time = event.time,
                matched = report.rules_matched,
                failed = report.failures.len(),
                "event processed"
            );
            return Some(StepOutcome {
                time: self.scheduler.current_time(),
                event,
                report,
                heartbeats,
            });
        }
    }

    /// Runs every rule triggered by `event` without touching the queue.
    pub fn process(&mut self, event: &ScheduledEvent) -> EventReport {
        Interpreter::new(
            &mut self.world,
            &mut self.scheduler,
            &self.rules,
            &mut self.rng,
            &self.limits,
            &mut self.trace,
            event,
        )
        .run()
    }

    /// Drops pending events, rewinds time, removes entities and reseeds the
    /// random source. Schemas, rules and functions stay loaded.
    pub fn reset(&mut self) {
        self.scheduler.reset();
        self.watchdog.forget();
        self.world.clear_entities();
        self.rng = ChaCha8Rng::seed_from_u64(self.seed);
        self.trace.drain();
    }

    /// Removes everything, loaded tables included.
    pub fn clear(&mut self) {
        self.reset();
        self.world.clear();
        self.rules.clear();
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Returns the world.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Returns the world for direct edits.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Returns the scheduler.
    #[must_use]
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Returns the loaded rules.
    #[must_use]
    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Returns the watchdog.
    #[must_use]
    pub fn watchdog(&self) -> &Watchdog {
        &self.watchdog
    }

    /// Returns the execution limits.
    #[must_use]
    pub fn limits(&self) -> &ExecutionLimits {
        &self.limits
    }

    /// Returns the RNG seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Returns the current simulation time.
    #[must_use]
    pub fn current_time(&self) -> f64 {
        self.scheduler.current_time()
    }

    /// Returns the trace sink.
    #[must_use]
    pub fn trace(&self) -> &TraceSink {
        &self.trace
    }

    /// Returns the trace sink for draining or toggling.
    pub fn trace_mut(&mut self) -> &mut TraceSink {
        &mut self.trace
    }
}
