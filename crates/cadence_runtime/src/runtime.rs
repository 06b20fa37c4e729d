//! The host-facing runtime: loading, lifecycle, stepping and queries.

use std::fmt;

use cadence_engine::{
    BoundFunctionInfo, Engine, EventId, MergeOptions, MergeReport, ScheduleOptions, StepOutcome,
    bound,
};
use cadence_foundation::{EntityId, Error, Result, Value};
use cadence_ir::{BoundFunction, EntityDef, IrModule};
use cadence_storage::{Record, World, WorldSnapshot};
use tracing::{debug, info, warn};

use crate::config::{RunLimits, RuntimeConfig};
use crate::hooks::{HookResult, Hooks, Notification, SubscriberId};
use crate::serialize;
use crate::trace::{TraceBuffer, TraceRecord};

// =============================================================================
// State
// =============================================================================

/// Lifecycle state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RuntimeState {
    /// Loaded (or empty) and not started.
    Idle,
    /// Started; the host is driving steps.
    Running,
    /// Paused; merging is allowed.
    Paused,
    /// Stopped; reset or load to continue.
    Stopped,
}

impl fmt::Display for RuntimeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Stopped => "stopped",
        })
    }
}

/// Summary of a batch run.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RunSummary {
    /// Steps that returned an event.
    pub events: usize,
    /// Heartbeats consumed across those steps.
    pub heartbeats: usize,
    /// Simulation time at the end of the run.
    pub time: f64,
    /// The queue ran dry.
    pub completed: bool,
    /// The next event lies past the time horizon.
    pub reached_time_limit: bool,
}

// =============================================================================
// Runtime
// =============================================================================

/// A simulation instance.
///
/// Execution is single-threaded: each [`step`](Self::step) processes one
/// event to completion. Merging requires the runtime not to be running.
#[derive(Debug)]
pub struct Runtime {
    config: RuntimeConfig,
    engine: Engine,
    state: RuntimeState,
    modules: Vec<String>,
    initial_entities: Vec<EntityDef>,
    hooks: Hooks,
    trace: TraceBuffer,
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new(RuntimeConfig::default())
    }
}

impl Runtime {
    /// Creates an empty runtime.
    #[must_use]
    pub fn new(config: RuntimeConfig) -> Self {
        let mut engine = Engine::new(config.seed, config.limits.clone(), config.watchdog.clone());
        engine.trace_mut().set_enabled(config.trace.enabled);
        let trace = TraceBuffer::new(config.trace.buffer_size);
        Self {
            config,
            engine,
            state: RuntimeState::Idle,
            modules: Vec::new(),
            initial_entities: Vec::new(),
            hooks: Hooks::new(),
            trace,
        }
    }

    /// Creates a runtime and loads a JSON module into it.
    ///
    /// # Errors
    ///
    /// Returns a load error if the module is invalid.
    pub fn from_json(json: &str, config: RuntimeConfig) -> Result<Self> {
        let mut runtime = Self::new(config);
        runtime.load_json(json)?;
        Ok(runtime)
    }

    // =========================================================================
    // Loading
    // =========================================================================

    /// Loads a module from JSON text, replacing whatever was loaded.
    ///
    /// # Errors
    ///
    /// Returns `InvalidIr`/`UnsupportedVersion` for a bad module and
    /// `InvalidState` while running.
    pub fn load_json(&mut self, json: &str) -> Result<()> {
        let module = cadence_ir::load_json(json)?;
        self.load_module(module)
    }

    /// Loads a module from already-parsed JSON.
    ///
    /// # Errors
    ///
    /// As [`load_json`](Self::load_json).
    pub fn load_value(&mut self, value: serde_json::Value) -> Result<()> {
        let module = cadence_ir::load_value(value)?;
        self.load_module(module)
    }

    /// Loads a module from its `MessagePack` encoding.
    ///
    /// # Errors
    ///
    /// As [`load_json`](Self::load_json), plus decoding errors.
    pub fn load_msgpack(&mut self, bytes: &[u8]) -> Result<()> {
        let module = cadence_ir::load_msgpack(bytes)?;
        self.load_module(module)
    }

    /// Loads a validated module, replacing whatever was loaded. Nothing is
    /// kept from a failed load.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` while running, or an error if an initial
    /// entity cannot be created.
    pub fn load_module(&mut self, module: IrModule) -> Result<()> {
        self.require_not_running("load a module")?;
        self.engine.clear();
        self.trace.clear();
        if let Err(error) = self.engine.install(&module) {
            self.engine.clear();
            self.modules.clear();
            self.initial_entities.clear();
            return Err(error);
        }
        self.initial_entities = module.initial_entities().to_vec();
        self.modules = vec![module.module.clone()];
        self.set_state(RuntimeState::Idle);
        self.hooks.notify(&Notification::Loaded {
            module: &module.module,
        });
        Ok(())
    }

    /// Replaces the initial entities and respawns them.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` while running, or `EntityExists` for duplicate
    /// explicit ids.
    pub fn set_initial_entities(&mut self, entities: Vec<EntityDef>) -> Result<Vec<EntityId>> {
        self.require_not_running("set initial entities")?;
        self.engine.world_mut().clear_entities();
        self.initial_entities = entities;
        self.engine.spawn_entities(&self.initial_entities)
    }

    /// Merges another module into this instance.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` while running and `MergeConflict` on an
    /// incompatible field redeclaration without `override_types`.
    pub fn merge(&mut self, module: &IrModule, options: MergeOptions) -> Result<MergeReport> {
        self.require_not_running("merge")?;
        let report = self.engine.merge(module, options)?;

        if options.merge_entities {
            let known: Vec<Option<u64>> = self.initial_entities.iter().map(|e| e.id).collect();
            self.initial_entities.extend(
                module
                    .initial_entities()
                    .iter()
                    .filter(|e| e.id.is_none() || !known.contains(&e.id))
                    .cloned(),
            );
        }
        self.modules.push(module.module.clone());
        self.hooks.notify(&Notification::Merged {
            module: &module.module,
            report: &report,
        });
        Ok(report)
    }

    /// Merges a module given as JSON text.
    ///
    /// # Errors
    ///
    /// As [`merge`](Self::merge), plus load errors.
    pub fn merge_json(&mut self, json: &str, options: MergeOptions) -> Result<MergeReport> {
        let module = cadence_ir::load_json(json)?;
        self.merge(&module, options)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Starts (or restarts after stop) the simulation and arms the watchdog.
    ///
    /// # Errors
    ///
    /// Propagates watchdog scheduling errors.
    pub fn start(&mut self) -> Result<()> {
        if self.state == RuntimeState::Running {
            return Ok(());
        }
        self.engine.arm_watchdog()?;
        self.set_state(RuntimeState::Running);
        Ok(())
    }

    /// Pauses a running simulation.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` unless running.
    pub fn pause(&mut self) -> Result<()> {
        if self.state != RuntimeState::Running {
            return Err(Error::invalid_state("pause", self.state.to_string()));
        }
        self.set_state(RuntimeState::Paused);
        Ok(())
    }

    /// Resumes a paused simulation and re-arms the watchdog.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` unless paused.
    pub fn resume(&mut self) -> Result<()> {
        if self.state != RuntimeState::Paused {
            return Err(Error::invalid_state("resume", self.state.to_string()));
        }
        self.engine.arm_watchdog()?;
        self.set_state(RuntimeState::Running);
        Ok(())
    }

    /// Stops the simulation and cancels the watchdog.
    pub fn stop(&mut self) {
        self.engine.disarm_watchdog();
        self.set_state(RuntimeState::Stopped);
    }

    /// Clears events, time and entities, then respawns the initial entities.
    /// Loaded and merged rules stay.
    ///
    /// # Errors
    ///
    /// Returns an error if an initial entity cannot be respawned.
    pub fn reset(&mut self) -> Result<()> {
        self.engine.reset();
        self.trace.clear();
        self.engine.spawn_entities(&self.initial_entities)?;
        self.set_state(RuntimeState::Idle);
        self.hooks.notify(&Notification::Reset);
        Ok(())
    }

    /// Drops every subscriber and trace record.
    pub fn teardown(&mut self) {
        self.hooks.clear();
        self.trace.clear();
        self.engine.trace_mut().set_enabled(self.config.trace.enabled);
    }

    // =========================================================================
    // Stepping
    // =========================================================================

    /// Processes exactly one event. Returns `Ok(None)` when the queue is
    /// empty.
    ///
    /// Rules that fail do not stop the others handling the same event. If
    /// any failed, every failure is reported to subscribers and the first
    /// one is returned as the error; the world keeps the effects of
    /// everything that succeeded.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` when paused or stopped, or the first rule
    /// failure. An idle runtime may be stepped by hand without `start`.
    pub fn step(&mut self) -> Result<Option<StepOutcome>> {
        if matches!(self.state, RuntimeState::Paused | RuntimeState::Stopped) {
            return Err(Error::invalid_state("step", self.state.to_string()));
        }

        let Some(mut outcome) = self.engine.step() else {
            self.flush_trace();
            let time = self.engine.current_time();
            debug!(time, "queue empty");
            self.hooks.notify(&Notification::Completed { time });
            return Ok(None);
        };
        self.flush_trace();

        self.hooks.notify(&Notification::Step {
            event: &outcome.event,
            time: outcome.time,
        });
        for failure in &outcome.report.failures {
            self.hooks.notify(&Notification::RuleFailed { failure });
        }

        if outcome.report.failures.is_empty() {
            return Ok(Some(outcome));
        }
        let mut failures = std::mem::take(&mut outcome.report.failures).into_iter();
        let first = failures.next().map(|f| f.error);
        let remaining = failures.len();
        if remaining > 0 {
            warn!(
                event = %outcome.event.event_type,
                remaining,
                "additional rule failures while processing event"
            );
        }
        Err(first.unwrap_or_else(|| Error::internal("failure list emptied")))
    }

    /// Processes up to `count` events.
    ///
    /// # Errors
    ///
    /// Stops at and returns the first step error.
    pub fn run_steps(&mut self, count: usize) -> Result<RunSummary> {
        self.run(RunLimits::events(count))
    }

    /// Processes events until the queue empties or `max_events` have run.
    ///
    /// # Errors
    ///
    /// Stops at and returns the first step error.
    pub fn run_until_complete(&mut self, max_events: usize) -> Result<RunSummary> {
        self.run(RunLimits::events(max_events))
    }

    /// Processes events within `limits`.
    ///
    /// # Errors
    ///
    /// Stops at and returns the first step error.
    pub fn run(&mut self, limits: RunLimits) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        while limits.max_events.is_none_or(|max| summary.events < max) {
            if let (Some(horizon), Some(next)) = (limits.max_time, self.engine.scheduler().peek()) {
                if next.time > horizon {
                    summary.reached_time_limit = true;
                    break;
                }
            }
            match self.step()? {
                Some(outcome) => {
                    summary.events += 1;
                    summary.heartbeats += outcome.heartbeats;
                }
                None => {
                    summary.completed = true;
                    break;
                }
            }
        }
        summary.time = self.engine.current_time();
        Ok(summary)
    }

    // =========================================================================
    // Scheduling
    // =========================================================================

    /// Schedules a host-initiated event. Re-arms a dormant watchdog while
    /// running.
    ///
    /// # Errors
    ///
    /// Propagates watchdog scheduling errors.
    pub fn schedule_event(
        &mut self,
        event_type: impl Into<String>,
        delay: f64,
        opts: ScheduleOptions,
    ) -> Result<EventId> {
        let id = self.engine.schedule(event_type, delay, opts);
        if self.state == RuntimeState::Running {
            self.engine.arm_watchdog()?;
        }
        Ok(id)
    }

    /// Cancels a pending event.
    pub fn cancel_event(&mut self, id: EventId) -> bool {
        self.engine.cancel(id)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Returns the lifecycle state.
    #[must_use]
    pub fn state(&self) -> RuntimeState {
        self.state
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Returns the names of the loaded and merged modules.
    #[must_use]
    pub fn modules(&self) -> &[String] {
        &self.modules
    }

    /// Returns the current simulation time.
    #[must_use]
    pub fn current_time(&self) -> f64 {
        self.engine.current_time()
    }

    /// Returns the number of pending events, heartbeats included.
    #[must_use]
    pub fn pending_events(&self) -> usize {
        self.engine.scheduler().len()
    }

    /// Returns the engine.
    #[must_use]
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Returns the engine for direct manipulation, such as installing a
    /// custom watchdog heuristic.
    pub fn engine_mut(&mut self) -> &mut Engine {
        &mut self.engine
    }

    /// Returns the world.
    #[must_use]
    pub fn world(&self) -> &World {
        self.engine.world()
    }

    /// Lists live entities in id order.
    #[must_use]
    pub fn entities(&self) -> Vec<EntityId> {
        self.world().entities().collect()
    }

    /// Lists an entity's components in name order.
    #[must_use]
    pub fn components_of(&self, entity: EntityId) -> Vec<&str> {
        self.world().components_of(entity).collect()
    }

    /// Gets a component record.
    #[must_use]
    pub fn get_component(&self, entity: EntityId, component: &str) -> Option<&Record> {
        self.world().get_component(entity, component)
    }

    /// Gets a single field.
    #[must_use]
    pub fn get_field(&self, entity: EntityId, component: &str, field: &str) -> Option<&Value> {
        self.world().get_field(entity, component, field)
    }

    /// Writes a single field from the host.
    ///
    /// # Errors
    ///
    /// Returns `EntityNotFound` if the entity is not live.
    pub fn set_field(
        &mut self,
        entity: EntityId,
        component: &str,
        field: &str,
        value: Value,
    ) -> Result<()> {
        self.engine.world_mut().set_field(entity, component, field, value)
    }

    /// Returns entities carrying every listed component.
    #[must_use]
    pub fn query<S: AsRef<str>>(&self, components: &[S]) -> Vec<EntityId> {
        let components: Vec<String> = components.iter().map(|c| c.as_ref().to_string()).collect();
        self.world().query(&components)
    }

    /// Looks up an initial-state entity by name.
    #[must_use]
    pub fn entity_by_name(&self, name: &str) -> Option<EntityId> {
        self.world().entity_by_name(name)
    }

    /// Captures a detached copy of the world.
    #[must_use]
    pub fn snapshot(&self) -> WorldSnapshot {
        self.world().snapshot(self.current_time())
    }

    /// Captures a snapshot encoded as `MessagePack`.
    ///
    /// # Errors
    ///
    /// Returns a serialization error if encoding fails.
    pub fn snapshot_msgpack(&self) -> Result<Vec<u8>> {
        serialize::snapshot_to_bytes(&self.snapshot())
    }

    /// Lists an entity's bound functions with their signatures and source.
    #[must_use]
    pub fn bound_functions(&self, entity: EntityId) -> Vec<BoundFunctionInfo> {
        bound::describe(self.world(), entity)
    }

    /// Looks up one bound function.
    ///
    /// # Errors
    ///
    /// Returns `UnknownBoundFunction` if the entity has no such function.
    pub fn bound_function(&self, entity: EntityId, name: &str) -> Result<&BoundFunction> {
        bound::resolve(self.world(), entity, name)
    }

    // =========================================================================
    // Hooks and tracing
    // =========================================================================

    /// Adds a lifecycle/step subscriber.
    pub fn subscribe(
        &mut self,
        hook: impl FnMut(&Notification<'_>) -> HookResult + 'static,
    ) -> SubscriberId {
        self.hooks.subscribe(hook)
    }

    /// Adds a trace subscriber and turns tracing on.
    pub fn subscribe_trace(
        &mut self,
        hook: impl FnMut(&TraceRecord) -> HookResult + 'static,
    ) -> SubscriberId {
        self.engine.trace_mut().set_enabled(true);
        self.hooks.subscribe_trace(hook)
    }

    /// Removes a subscriber.
    pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        self.hooks.unsubscribe(id)
    }

    /// Turns execution tracing on or off.
    pub fn set_tracing(&mut self, enabled: bool) {
        self.engine.trace_mut().set_enabled(enabled);
    }

    /// Returns true if execution tracing is on.
    #[must_use]
    pub fn is_tracing(&self) -> bool {
        self.engine.trace().is_enabled()
    }

    /// Returns the trace buffer.
    #[must_use]
    pub fn trace_buffer(&self) -> &TraceBuffer {
        &self.trace
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn flush_trace(&mut self) {
        let events = self.engine.trace_mut().drain();
        if events.is_empty() {
            return;
        }
        let time = self.engine.current_time();
        for event in events {
            let record = self.trace.push(time, event);
            self.hooks.notify_trace(record);
        }
    }

    fn set_state(&mut self, to: RuntimeState) {
        let from = self.state;
        if from == to {
            return;
        }
        self.state = to;
        info!(%from, %to, "runtime state changed");
        self.hooks.notify(&Notification::StateChanged { from, to });
    }

    fn require_not_running(&self, operation: &str) -> Result<()> {
        if self.state == RuntimeState::Running {
            return Err(Error::invalid_state(operation, self.state.to_string()));
        }
        Ok(())
    }
}
