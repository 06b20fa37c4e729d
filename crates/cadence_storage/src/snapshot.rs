//! Detached copies of world state.
//!
//! A snapshot owns deep copies of every value, so a host can keep, mutate or
//! serialize it without touching the live store.

use std::collections::BTreeMap;

use cadence_foundation::{EntityId, Value};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Full world state at one point in time.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WorldSnapshot {
    /// Simulation time the snapshot was taken at.
    pub time: f64,
    /// Entities in id order.
    pub entities: BTreeMap<EntityId, EntitySnapshot>,
}

/// One entity's state.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EntitySnapshot {
    /// Name from initial state, if any.
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub name: Option<String>,
    /// Component name to field values.
    pub components: BTreeMap<String, BTreeMap<String, Value>>,
    /// Names of bound functions carried by the entity.
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Vec::is_empty"))]
    pub bound_functions: Vec<String>,
}

impl WorldSnapshot {
    /// Returns the number of entities captured.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns true if no entities were captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Looks up an entity.
    #[must_use]
    pub fn entity(&self, id: EntityId) -> Option<&EntitySnapshot> {
        self.entities.get(&id)
    }

    /// Looks up a single field.
    #[must_use]
    pub fn field(&self, id: EntityId, component: &str, field: &str) -> Option<&Value> {
        self.entities
            .get(&id)?
            .components
            .get(component)?
            .get(field)
    }
}
