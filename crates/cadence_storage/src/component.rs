//! Component storage.
//!
//! Records are stored per component name, then per entity, so that a
//! multi-component query walks the smallest table and checks the rest.
//! A per-entity index of attached component names keeps entity-level
//! operations (delete, clone, snapshot) cheap.

use std::collections::{BTreeMap, BTreeSet};

use cadence_foundation::{EntityId, PMap, Value};

use crate::schema::ComponentSchema;

/// Field values of one component instance.
pub type Record = PMap<String, Value>;

/// Stores all component data for entities.
#[derive(Clone, Debug, Default)]
pub struct ComponentStore {
    /// Registered schemas by component name.
    schemas: BTreeMap<String, ComponentSchema>,
    /// Component data: component -> entity -> record.
    data: BTreeMap<String, BTreeMap<EntityId, Record>>,
    /// Component names attached to each entity.
    attached: BTreeMap<EntityId, BTreeSet<String>>,
}

impl ComponentStore {
    /// Creates a new empty component store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a component schema, replacing any previous one of the
    /// same name. Returns the replaced schema.
    pub fn register_schema(&mut self, schema: ComponentSchema) -> Option<ComponentSchema> {
        self.schemas.insert(schema.name.clone(), schema)
    }

    /// Gets the schema for a component type.
    #[must_use]
    pub fn schema(&self, component: &str) -> Option<&ComponentSchema> {
        self.schemas.get(component)
    }

    /// Iterates registered schemas in name order.
    pub fn schemas(&self) -> impl Iterator<Item = &ComponentSchema> {
        self.schemas.values()
    }

    /// Attaches a component built from registered defaults overlaid with
    /// `init`. An unregistered component starts from `init` alone.
    ///
    /// Replaces any existing instance of the same component.
    pub fn attach<'a, I>(&mut self, entity: EntityId, component: &str, init: I)
    where
        I: IntoIterator<Item = (&'a String, &'a Value)>,
    {
        let record = match self.schemas.get(component) {
            Some(schema) => schema.instantiate(init),
            None => init
                .into_iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        };
        self.insert(entity, component, record);
    }

    /// Stores a record verbatim.
    pub fn insert(&mut self, entity: EntityId, component: &str, record: Record) {
        self.data
            .entry(component.to_string())
            .or_default()
            .insert(entity, record);
        self.attached
            .entry(entity)
            .or_default()
            .insert(component.to_string());
    }

    /// Removes a component from an entity, returning its record.
    pub fn remove(&mut self, entity: EntityId, component: &str) -> Option<Record> {
        let record = self.data.get_mut(component)?.remove(&entity)?;
        if let Some(names) = self.attached.get_mut(&entity) {
            names.remove(component);
        }
        Some(record)
    }

    /// Removes every component of an entity.
    pub fn remove_entity(&mut self, entity: EntityId) {
        let Some(names) = self.attached.remove(&entity) else {
            return;
        };
        for name in names {
            if let Some(table) = self.data.get_mut(&name) {
                table.remove(&entity);
            }
        }
    }

    /// Checks if an entity has a component.
    #[must_use]
    pub fn has(&self, entity: EntityId, component: &str) -> bool {
        self.data
            .get(component)
            .is_some_and(|table| table.contains_key(&entity))
    }

    /// Gets a component record.
    #[must_use]
    pub fn get(&self, entity: EntityId, component: &str) -> Option<&Record> {
        self.data.get(component)?.get(&entity)
    }

    /// Gets a single field.
    #[must_use]
    pub fn get_field(&self, entity: EntityId, component: &str, field: &str) -> Option<&Value> {
        self.get(entity, component)?.get(field)
    }

    /// Writes a single field, attaching the component from defaults first
    /// if the entity lacks it. The value is coerced to the declared type.
    ///
    /// Returns false if the field already held the coerced value.
    pub fn set_field(
        &mut self,
        entity: EntityId,
        component: &str,
        field: &str,
        value: Value,
    ) -> bool {
        let value = match self.schemas.get(component) {
            Some(schema) => schema.coerce(field, value),
            None => value,
        };
        if self.get_field(entity, component, field) == Some(&value) {
            return false;
        }
        if !self.has(entity, component) {
            self.attach(entity, component, std::iter::empty());
        }
        if let Some(record) = self
            .data
            .get_mut(component)
            .and_then(|table| table.get_mut(&entity))
        {
            record.insert_mut(field.to_string(), value);
        }
        true
    }

    /// Iterates the component names attached to an entity, in name order.
    pub fn components_of(&self, entity: EntityId) -> impl Iterator<Item = &str> {
        self.attached
            .get(&entity)
            .into_iter()
            .flat_map(|names| names.iter().map(String::as_str))
    }

    /// Returns entities carrying every listed component, in id order.
    ///
    /// An empty list matches nothing; callers wanting every entity should
    /// ask the entity store instead.
    #[must_use]
    pub fn with_all(&self, components: &[String]) -> Vec<EntityId> {
        let mut tables = Vec::with_capacity(components.len());
        for name in components {
            match self.data.get(name) {
                Some(table) => tables.push(table),
                None => return Vec::new(),
            }
        }
        tables.sort_by_key(|table| table.len());
        let Some((smallest, rest)) = tables.split_first() else {
            return Vec::new();
        };
        smallest
            .keys()
            .filter(|id| rest.iter().all(|table| table.contains_key(id)))
            .copied()
            .collect()
    }

    /// Applies `f` to every instance of a component.
    pub fn for_each_instance_mut(&mut self, component: &str, mut f: impl FnMut(&mut Record)) {
        if let Some(table) = self.data.get_mut(component) {
            for record in table.values_mut() {
                f(record);
            }
        }
    }

    /// Removes all data and schemas.
    pub fn clear(&mut self) {
        self.schemas.clear();
        self.data.clear();
        self.attached.clear();
    }
}
