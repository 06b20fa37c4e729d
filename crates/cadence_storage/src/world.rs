//! The world store.
//!
//! `World` is the unified interface to entity, component, name and
//! bound-function storage. Inner stores sit behind `Arc` so cloning a world
//! is O(1); writes copy a store only when a clone still shares it.

use std::collections::BTreeMap;
use std::sync::Arc;

use cadence_foundation::{EntityId, Error, FieldType, Result, Value};
use cadence_ir::BoundFunction;
use indexmap::IndexMap;
use tracing::trace;

use crate::component::{ComponentStore, Record};
use crate::entity::EntityStore;
use crate::schema::{ComponentSchema, FieldSchema};
use crate::snapshot::{EntitySnapshot, WorldSnapshot};

type BoundTable = BTreeMap<EntityId, IndexMap<String, BoundFunction>>;

/// Entity-component store with typed defaults.
#[derive(Clone, Debug, Default)]
pub struct World {
    /// Entity lifecycle.
    entities: Arc<EntityStore>,
    /// Component schemas and data.
    components: Arc<ComponentStore>,
    /// Per-entity decision functions.
    bound: Arc<BoundTable>,
    /// Initial-state names.
    names: Arc<BTreeMap<String, EntityId>>,
    /// Bumped by every write that changes entity state.
    revision: u64,
}

impl World {
    /// Creates an empty world.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a counter that changes whenever entity state changes.
    ///
    /// Writing a value a field already holds leaves it unchanged, so two
    /// equal revisions mean nothing observable happened in between.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }

    // ========================================================================
    // Schemas
    // ========================================================================

    /// Registers a component schema, replacing any previous definition.
    pub fn register_component(&mut self, schema: ComponentSchema) -> Option<ComponentSchema> {
        Arc::make_mut(&mut self.components).register_schema(schema)
    }

    /// Returns a component schema.
    #[must_use]
    pub fn component_schema(&self, name: &str) -> Option<&ComponentSchema> {
        self.components.schema(name)
    }

    /// Iterates registered schemas in name order.
    pub fn component_schemas(&self) -> impl Iterator<Item = &ComponentSchema> {
        self.components.schemas()
    }

    /// Returns the declared type of a field.
    #[must_use]
    pub fn field_type(&self, component: &str, field: &str) -> Option<&FieldType> {
        self.components
            .schema(component)?
            .field(field)
            .map(|f| &f.ty)
    }

    /// Returns the registered default of a field.
    #[must_use]
    pub fn field_default(&self, component: &str, field: &str) -> Option<&Value> {
        self.components
            .schema(component)?
            .field(field)
            .map(|f| &f.default)
    }

    /// Adds or retypes a single field of a registered component and brings
    /// existing instances in line.
    ///
    /// Instances lacking the field receive its default. Instances holding
    /// the field have their value coerced to the (possibly new) type. The
    /// component is registered first if unknown.
    pub fn merge_field(&mut self, component: &str, field: FieldSchema) {
        let components = Arc::make_mut(&mut self.components);
        let mut schema = components
            .schema(component)
            .cloned()
            .unwrap_or_else(|| ComponentSchema::new(component));
        schema.upsert_field(field.clone());
        components.register_schema(schema);

        let mut touched = false;
        components.for_each_instance_mut(component, |record| {
            touched = true;
            let value = match record.get(&field.name) {
                Some(current) => field.ty.coerce(current.clone()),
                None => field.default.clone(),
            };
            record.insert_mut(field.name.clone(), value);
        });
        if touched {
            self.touch();
        }
    }

    // ========================================================================
    // Entities
    // ========================================================================

    /// Creates an entity with a freshly allocated id.
    pub fn create_entity(&mut self) -> EntityId {
        let id = Arc::make_mut(&mut self.entities).spawn();
        self.touch();
        trace!(entity = %id, "created entity");
        id
    }

    /// Creates an entity under a caller-chosen id.
    ///
    /// # Errors
    ///
    /// Returns `EntityExists` if the id is live.
    pub fn create_entity_with_id(&mut self, id: EntityId) -> Result<()> {
        Arc::make_mut(&mut self.entities).insert(id)?;
        self.touch();
        trace!(entity = %id, "created entity with explicit id");
        Ok(())
    }

    /// Deletes an entity with all its components, name and bound functions.
    ///
    /// # Errors
    ///
    /// Returns `EntityNotFound` if the entity is not live.
    pub fn delete_entity(&mut self, id: EntityId) -> Result<()> {
        Arc::make_mut(&mut self.entities).destroy(id)?;
        Arc::make_mut(&mut self.components).remove_entity(id);
        if self.bound.contains_key(&id) {
            Arc::make_mut(&mut self.bound).remove(&id);
        }
        if self.names.values().any(|e| *e == id) {
            Arc::make_mut(&mut self.names).retain(|_, e| *e != id);
        }
        self.touch();
        trace!(entity = %id, "deleted entity");
        Ok(())
    }

    /// Checks if an entity is live.
    #[must_use]
    pub fn has_entity(&self, id: EntityId) -> bool {
        self.entities.exists(id)
    }

    /// Returns the number of live entities.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Iterates live entities in id order.
    pub fn entities(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entities.iter()
    }

    /// Names an entity so rules can refer to it as `@name`.
    ///
    /// # Errors
    ///
    /// Returns `EntityNotFound` if the entity is not live.
    pub fn set_name(&mut self, id: EntityId, name: impl Into<String>) -> Result<()> {
        self.entities.validate(id)?;
        Arc::make_mut(&mut self.names).insert(name.into(), id);
        self.touch();
        Ok(())
    }

    /// Resolves an entity name.
    #[must_use]
    pub fn entity_by_name(&self, name: &str) -> Option<EntityId> {
        self.names
            .get(name)
            .copied()
            .filter(|id| self.entities.exists(*id))
    }

    /// Returns an entity's name.
    #[must_use]
    pub fn name_of(&self, id: EntityId) -> Option<&str> {
        self.names
            .iter()
            .find(|(_, e)| **e == id)
            .map(|(name, _)| name.as_str())
    }

    // ========================================================================
    // Components
    // ========================================================================

    /// Attaches a component from registered defaults overlaid with `init`.
    ///
    /// # Errors
    ///
    /// Returns `EntityNotFound` if the entity is not live.
    pub fn add_component<'a, I>(&mut self, entity: EntityId, component: &str, init: I) -> Result<()>
    where
        I: IntoIterator<Item = (&'a String, &'a Value)>,
    {
        self.entities.validate(entity)?;
        Arc::make_mut(&mut self.components).attach(entity, component, init);
        self.touch();
        Ok(())
    }

    /// Detaches a component. Returns whether it was attached.
    ///
    /// # Errors
    ///
    /// Returns `EntityNotFound` if the entity is not live.
    pub fn remove_component(&mut self, entity: EntityId, component: &str) -> Result<bool> {
        self.entities.validate(entity)?;
        if !self.components.has(entity, component) {
            return Ok(false);
        }
        let removed = Arc::make_mut(&mut self.components)
            .remove(entity, component)
            .is_some();
        if removed {
            self.touch();
        }
        Ok(removed)
    }

    /// Checks if an entity has a component.
    #[must_use]
    pub fn has_component(&self, entity: EntityId, component: &str) -> bool {
        self.entities.exists(entity) && self.components.has(entity, component)
    }

    /// Gets a component record.
    #[must_use]
    pub fn get_component(&self, entity: EntityId, component: &str) -> Option<&Record> {
        self.components.get(entity, component)
    }

    /// Gets a single field.
    #[must_use]
    pub fn get_field(&self, entity: EntityId, component: &str, field: &str) -> Option<&Value> {
        self.components.get_field(entity, component, field)
    }

    /// Writes a single field, attaching the component from defaults if the
    /// entity lacks it.
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
        self.entities.validate(entity)?;
        if Arc::make_mut(&mut self.components).set_field(entity, component, field, value) {
            self.touch();
        }
        Ok(())
    }

    /// Iterates the components attached to an entity, in name order.
    pub fn components_of(&self, entity: EntityId) -> impl Iterator<Item = &str> {
        self.components.components_of(entity)
    }

    /// Returns entities carrying every listed component, in id order.
    /// An empty list returns every entity.
    #[must_use]
    pub fn query(&self, components: &[String]) -> Vec<EntityId> {
        if components.is_empty() {
            return self.entities.iter().collect();
        }
        self.components.with_all(components)
    }

    /// Deep-copies an entity's components and bound functions onto a new
    /// entity, allocated or created under `target`.
    ///
    /// # Errors
    ///
    /// Returns `EntityNotFound` if `source` is not live and `EntityExists`
    /// if `target` is.
    pub fn clone_entity(&mut self, source: EntityId, target: Option<EntityId>) -> Result<EntityId> {
        self.entities.validate(source)?;
        let copies: Vec<(String, Record)> = self
            .components
            .components_of(source)
            .filter_map(|name| {
                let record = self.components.get(source, name)?;
                Some((name.to_string(), deep_copy_record(record)))
            })
            .collect();
        let bound = self.bound.get(&source).cloned();

        let id = match target {
            Some(id) => {
                self.create_entity_with_id(id)?;
                id
            }
            None => self.create_entity(),
        };
        let components = Arc::make_mut(&mut self.components);
        for (name, record) in copies {
            components.insert(id, &name, record);
        }
        if let Some(bound) = bound {
            Arc::make_mut(&mut self.bound).insert(id, bound);
        }
        trace!(source = %source, clone = %id, "cloned entity");
        Ok(id)
    }

    // ========================================================================
    // Bound functions
    // ========================================================================

    /// Attaches a decision function to an entity, replacing one of the same
    /// name.
    ///
    /// # Errors
    ///
    /// Returns `EntityNotFound` if the entity is not live.
    pub fn set_bound_function(
        &mut self,
        entity: EntityId,
        name: impl Into<String>,
        function: BoundFunction,
    ) -> Result<()> {
        self.entities.validate(entity)?;
        Arc::make_mut(&mut self.bound)
            .entry(entity)
            .or_default()
            .insert(name.into(), function);
        self.touch();
        Ok(())
    }

    /// Looks up a bound function by name on exactly this entity.
    #[must_use]
    pub fn bound_function(&self, entity: EntityId, name: &str) -> Option<&BoundFunction> {
        self.bound.get(&entity)?.get(name)
    }

    /// Lists an entity's bound function names in attachment order.
    #[must_use]
    pub fn bound_function_names(&self, entity: EntityId) -> Vec<&str> {
        self.bound
            .get(&entity)
            .map(|table| table.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    // ========================================================================
    // Whole-world operations
    // ========================================================================

    /// Captures a detached deep copy of all entities.
    #[must_use]
    pub fn snapshot(&self, time: f64) -> WorldSnapshot {
        let entities = self
            .entities
            .iter()
            .map(|id| {
                let components = self
                    .components
                    .components_of(id)
                    .filter_map(|name| {
                        let record = self.components.get(id, name)?;
                        let fields = record
                            .iter()
                            .map(|(k, v)| (k.clone(), v.deep_clone()))
                            .collect();
                        Some((name.to_string(), fields))
                    })
                    .collect();
                let snapshot = EntitySnapshot {
                    name: self.name_of(id).map(str::to_string),
                    components,
                    bound_functions: self
                        .bound_function_names(id)
                        .into_iter()
                        .map(str::to_string)
                        .collect(),
                };
                (id, snapshot)
            })
            .collect();
        WorldSnapshot { time, entities }
    }

    /// Removes all entities while keeping registered schemas.
    pub fn clear_entities(&mut self) {
        let components = Arc::make_mut(&mut self.components);
        let ids: Vec<EntityId> = self.entities.iter().collect();
        for id in ids {
            components.remove_entity(id);
        }
        Arc::make_mut(&mut self.entities).clear();
        self.bound = Arc::default();
        self.names = Arc::default();
        self.touch();
    }

    /// Removes everything, schemas included.
    pub fn clear(&mut self) {
        let revision = self.revision;
        *self = Self::default();
        self.revision = revision;
        self.touch();
    }

    /// Validates that an entity is live.
    ///
    /// # Errors
    ///
    /// Returns `EntityNotFound` otherwise.
    pub fn validate(&self, id: EntityId) -> Result<()> {
        if self.has_entity(id) {
            Ok(())
        } else {
            Err(Error::entity_not_found(id))
        }
    }
}

fn deep_copy_record(record: &Record) -> Record {
    record
        .iter()
        .map(|(k, v)| (k.clone(), v.deep_clone()))
        .collect()
}
