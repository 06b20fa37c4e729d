//! Time-ordered event queue.
//!
//! A binary min-heap keyed on `(time, sequence)`. The sequence number is a
//! global insertion counter, so events scheduled for the same instant pop in
//! the order they were scheduled. Simulation time only moves forward: it
//! advances to each popped event's time, and scheduling into the past is
//! clamped to the present.

use cadence_foundation::{EntityId, Error, Result, Value};
use indexmap::IndexMap;

/// Identifier of a scheduled event. Stable across recurring re-insertions.
pub type EventId = u64;

// =============================================================================
// Scheduled Event
// =============================================================================

/// An event waiting in (or just popped from) the queue.
#[derive(Clone, Debug, PartialEq)]
pub struct ScheduledEvent {
    /// Event id.
    pub id: EventId,
    /// Event type that rules trigger on.
    pub event_type: String,
    /// Simulation time the event fires at.
    pub time: f64,
    /// Entity that caused the event.
    pub source: Option<EntityId>,
    /// Entity the event is aimed at.
    pub target: Option<EntityId>,
    /// Extra payload.
    pub fields: IndexMap<String, Value>,
    /// FIFO tie-breaker among equal times.
    pub sequence: u64,
    /// Re-insertion interval for recurring events.
    pub interval: Option<f64>,
}

impl ScheduledEvent {
    /// Returns true if the event re-inserts itself when popped.
    #[must_use]
    pub fn is_recurring(&self) -> bool {
        self.interval.is_some()
    }

    fn precedes(&self, other: &Self) -> bool {
        self.time
            .total_cmp(&other.time)
            .then(self.sequence.cmp(&other.sequence))
            .is_lt()
    }
}

/// Optional parts of a scheduled event.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScheduleOptions {
    /// Entity that caused the event.
    pub source: Option<EntityId>,
    /// Entity the event is aimed at.
    pub target: Option<EntityId>,
    /// Extra payload.
    pub fields: IndexMap<String, Value>,
}

impl ScheduleOptions {
    /// Creates empty options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the source entity.
    #[must_use]
    pub fn with_source(mut self, source: EntityId) -> Self {
        self.source = Some(source);
        self
    }

    /// Sets the target entity.
    #[must_use]
    pub fn with_target(mut self, target: EntityId) -> Self {
        self.target = Some(target);
        self
    }

    /// Adds a payload field.
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }
}

// =============================================================================
// Scheduler
// =============================================================================

/// Priority queue of pending events.
#[derive(Clone, Debug, Default)]
pub struct Scheduler {
    heap: Vec<ScheduledEvent>,
    current_time: f64,
    next_id: EventId,
    next_sequence: u64,
}

impl Scheduler {
    /// Creates an empty scheduler at time zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current simulation time.
    #[must_use]
    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    /// Returns the number of pending events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Returns true if nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Schedules an event `delay` time units from now.
    ///
    /// Negative or NaN delays are treated as zero.
    pub fn schedule(
        &mut self,
        event_type: impl Into<String>,
        delay: f64,
        opts: ScheduleOptions,
    ) -> EventId {
        let delay = if delay > 0.0 { delay } else { 0.0 };
        self.insert_new(event_type.into(), self.current_time + delay, opts, None)
    }

    /// Schedules an event at an absolute time, clamped to the present.
    pub fn schedule_at(
        &mut self,
        event_type: impl Into<String>,
        time: f64,
        opts: ScheduleOptions,
    ) -> EventId {
        let time = if time > self.current_time {
            time
        } else {
            self.current_time
        };
        self.insert_new(event_type.into(), time, opts, None)
    }

    /// Schedules an event at the current time, after everything already
    /// pending for the current time.
    pub fn schedule_immediate(
        &mut self,
        event_type: impl Into<String>,
        opts: ScheduleOptions,
    ) -> EventId {
        self.insert_new(event_type.into(), self.current_time, opts, None)
    }

    /// Schedules an event that fires every `interval`, starting one
    /// interval from now. The returned id stays valid for every repetition.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` if `interval` is not a positive finite number,
    /// since such an event would never let time advance.
    pub fn schedule_recurring(
        &mut self,
        event_type: impl Into<String>,
        interval: f64,
        opts: ScheduleOptions,
    ) -> Result<EventId> {
        self.schedule_recurring_after(event_type, interval, interval, opts)
    }

    /// Schedules a recurring event whose first firing is `delay` from now.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` if `interval` is not a positive finite number.
    pub fn schedule_recurring_after(
        &mut self,
        event_type: impl Into<String>,
        delay: f64,
        interval: f64,
        opts: ScheduleOptions,
    ) -> Result<EventId> {
        if !(interval.is_finite() && interval > 0.0) {
            return Err(Error::invalid_state(
                "schedule a recurring event",
                format!("interval is {interval}"),
            ));
        }
        let delay = if delay > 0.0 { delay } else { 0.0 };
        Ok(self.insert_new(
            event_type.into(),
            self.current_time + delay,
            opts,
            Some(interval),
        ))
    }

    /// Returns the next event without removing it.
    #[must_use]
    pub fn peek(&self) -> Option<&ScheduledEvent> {
        self.heap.first()
    }

    /// Removes and returns the next event, advancing time to it.
    ///
    /// A recurring event is re-inserted with the same id one interval later
    /// before this returns.
    pub fn pop(&mut self) -> Option<ScheduledEvent> {
        if self.heap.is_empty() {
            return None;
        }
        let event = self.heap.swap_remove(0);
        if !self.heap.is_empty() {
            self.sift_down(0);
        }
        if event.time > self.current_time {
            self.current_time = event.time;
        }

        if let Some(interval) = event.interval {
            let mut next = event.clone();
            next.time = event.time + interval;
            next.sequence = self.take_sequence();
            self.push(next);
        }
        Some(event)
    }

    /// Removes a pending event. Returns whether one was found.
    pub fn cancel(&mut self, id: EventId) -> bool {
        let Some(index) = self.heap.iter().position(|e| e.id == id) else {
            return false;
        };
        self.heap.swap_remove(index);
        if index < self.heap.len() {
            self.sift_down(index);
            self.sift_up(index);
        }
        true
    }

    /// Drops every pending event. Time is kept.
    pub fn clear(&mut self) {
        self.heap.clear();
    }

    /// Drops every pending event and rewinds time and counters to zero.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Iterates pending events in heap order (not pop order).
    pub fn iter(&self) -> impl Iterator<Item = &ScheduledEvent> {
        self.heap.iter()
    }

    /// Returns true if any pending event has a type other than `event_type`.
    #[must_use]
    pub fn has_pending_except(&self, event_type: &str) -> bool {
        self.heap.iter().any(|e| e.event_type != event_type)
    }

    /// Returns true if an event of this type is pending.
    #[must_use]
    pub fn has_pending(&self, event_type: &str) -> bool {
        self.heap.iter().any(|e| e.event_type == event_type)
    }

    // -------------------------------------------------------------------------
    // Heap internals
    // -------------------------------------------------------------------------

    fn insert_new(
        &mut self,
        event_type: String,
        time: f64,
        opts: ScheduleOptions,
        interval: Option<f64>,
    ) -> EventId {
        let id = self.next_id;
        self.next_id += 1;
        let sequence = self.take_sequence();
        self.push(ScheduledEvent {
            id,
            event_type,
            time,
            source: opts.source,
            target: opts.target,
            fields: opts.fields,
            sequence,
            interval,
        });
        id
    }

    fn take_sequence(&mut self) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        sequence
    }

    fn push(&mut self, event: ScheduledEvent) {
        self.heap.push(event);
        let last = self.heap.len() - 1;
        self.sift_up(last);
    }

    fn sift_up(&mut self, mut index: usize) {
        while index > 0 {
            let parent = (index - 1) / 2;
            if self.heap[index].precedes(&self.heap[parent]) {
                self.heap.swap(index, parent);
                index = parent;
            } else {
                break;
            }
        }
    }

    fn sift_down(&mut self, mut index: usize) {
        let len = self.heap.len();
        loop {
            let left = 2 * index + 1;
            let right = left + 1;
            let mut smallest = index;
            if left < len && self.heap[left].precedes(&self.heap[smallest]) {
                smallest = left;
            }
            if right < len && self.heap[right].precedes(&self.heap[smallest]) {
                smallest = right;
            }
            if smallest == index {
                break;
            }
            self.heap.swap(index, smallest);
            index = smallest;
        }
    }
}
