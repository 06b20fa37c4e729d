//! Entity allocation and liveness.
//!
//! Ids are handed out monotonically and never reused. Explicit ids (from
//! initial state or clone targets) push the allocator past them so later
//! allocations cannot collide.

use std::collections::BTreeSet;

use cadence_foundation::{EntityId, Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Tracks which entities are alive and which id comes next.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EntityStore {
    /// Live entities in id order.
    live: BTreeSet<EntityId>,
    /// Next id to allocate.
    next: u64,
}

impl EntityStore {
    /// Creates a new empty entity store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a fresh entity.
    pub fn spawn(&mut self) -> EntityId {
        // Skip ids claimed explicitly ahead of the counter.
        while self.live.contains(&EntityId::new(self.next)) {
            self.next += 1;
        }
        let id = EntityId::new(self.next);
        self.next += 1;
        self.live.insert(id);
        id
    }

    /// Registers an entity under a caller-chosen id.
    ///
    /// # Errors
    ///
    /// Returns `EntityExists` if the id is already live.
    pub fn insert(&mut self, id: EntityId) -> Result<()> {
        if !self.live.insert(id) {
            return Err(Error::entity_exists(id));
        }
        self.next = self.next.max(id.raw().saturating_add(1));
        Ok(())
    }

    /// Destroys an entity.
    ///
    /// # Errors
    ///
    /// Returns `EntityNotFound` if the entity is not live.
    pub fn destroy(&mut self, id: EntityId) -> Result<()> {
        if self.live.remove(&id) {
            Ok(())
        } else {
            Err(Error::entity_not_found(id))
        }
    }

    /// Checks if an entity is live.
    #[must_use]
    pub fn exists(&self, id: EntityId) -> bool {
        self.live.contains(&id)
    }

    /// Validates that an entity is live.
    ///
    /// # Errors
    ///
    /// Returns `EntityNotFound` otherwise.
    pub fn validate(&self, id: EntityId) -> Result<()> {
        if self.exists(id) {
            Ok(())
        } else {
            Err(Error::entity_not_found(id))
        }
    }

    /// Returns the number of live entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.live.len()
    }

    /// Returns true if there are no live entities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Returns the id the next [`spawn`](Self::spawn) would consider first.
    #[must_use]
    pub fn next_id(&self) -> u64 {
        self.next
    }

    /// Iterates live entities in id order.
    pub fn iter(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.live.iter().copied()
    }

    /// Removes every entity and resets the counter.
    pub fn clear(&mut self) {
        self.live.clear();
        self.next = 0;
    }
}
