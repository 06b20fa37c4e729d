//! Ring buffer for execution trace records.
//!
//! Keeps the most recent trace records so a host or tool can inspect what
//! the rules did without subscribing up front.

use std::collections::VecDeque;

use cadence_engine::TraceEvent;

// =============================================================================
// Trace Record
// =============================================================================

/// A trace event stamped with a sequence number and simulation time.
#[derive(Clone, Debug, PartialEq)]
pub struct TraceRecord {
    /// Monotonic record id. Never reused, even after eviction.
    pub id: u64,
    /// Simulation time when the record was captured.
    pub time: f64,
    /// The event.
    pub event: TraceEvent,
}

impl TraceRecord {
    /// Returns the event kind label.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        self.event.kind()
    }
}

// =============================================================================
// Trace Buffer
// =============================================================================

/// A ring buffer for storing trace records.
///
/// Maintains a fixed maximum size, discarding oldest records when full.
#[derive(Clone, Debug)]
pub struct TraceBuffer {
    /// The records, oldest first.
    records: VecDeque<TraceRecord>,
    /// Maximum number of records to store.
    max_size: usize,
    /// Next record ID to assign.
    next_id: u64,
}

impl Default for TraceBuffer {
    fn default() -> Self {
        Self::new(10_000)
    }
}

impl TraceBuffer {
    /// Creates a new trace buffer with the given maximum size.
    #[must_use]
    pub fn new(max_size: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(max_size.min(1024)),
            max_size,
            next_id: 0,
        }
    }

    /// Pushes a new event to the buffer.
    ///
    /// Returns the assigned record.
    pub fn push(&mut self, time: f64, event: TraceEvent) -> &TraceRecord {
        let id = self.next_id;
        self.next_id += 1;

        while self.records.len() >= self.max_size.max(1) {
            self.records.pop_front();
        }
        self.records.push_back(TraceRecord { id, time, event });
        // The buffer holds at least the record just pushed.
        &self.records[self.records.len() - 1]
    }

    /// Returns the number of records in the buffer.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the buffer is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns the capacity.
    #[must_use]
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Changes the capacity, evicting the oldest records if needed.
    pub fn set_max_size(&mut self, max_size: usize) {
        self.max_size = max_size;
        while self.records.len() > max_size {
            self.records.pop_front();
        }
    }

    /// Clears all records from the buffer.
    pub fn clear(&mut self) {
        self.records.clear();
        // Don't reset next_id - keep it monotonically increasing
    }

    /// Returns an iterator over all records, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &TraceRecord> {
        self.records.iter()
    }

    /// Returns the most recent N records, oldest first.
    #[must_use]
    pub fn recent(&self, count: usize) -> Vec<&TraceRecord> {
        let start = self.records.len().saturating_sub(count);
        self.records.iter().skip(start).collect()
    }

    /// Returns records captured in a time range (inclusive).
    #[must_use]
    pub fn records_in_range(&self, start: f64, end: f64) -> Vec<&TraceRecord> {
        self.records
            .iter()
            .filter(|r| r.time >= start && r.time <= end)
            .collect()
    }

    /// Returns records matching a predicate.
    pub fn filter<F>(&self, predicate: F) -> Vec<&TraceRecord>
    where
        F: Fn(&TraceRecord) -> bool,
    {
        self.records.iter().filter(|r| predicate(r)).collect()
    }

    /// Returns records of one kind, such as `"rule_triggered"`.
    #[must_use]
    pub fn by_kind(&self, kind: &str) -> Vec<&TraceRecord> {
        self.filter(|r| r.kind() == kind)
    }

    /// Returns the time of the oldest record.
    #[must_use]
    pub fn oldest_time(&self) -> Option<f64> {
        self.records.front().map(|r| r.time)
    }

    /// Returns the time of the newest record.
    #[must_use]
    pub fn newest_time(&self) -> Option<f64> {
        self.records.back().map(|r| r.time)
    }
}
