//! Component schemas: declared field types and defaults.
//!
//! Schemas are registered when a module is loaded or merged and consulted
//! whenever a component is attached or a field is written.

use cadence_foundation::{FieldType, Value};
use cadence_ir::ComponentDef;

use crate::component::Record;

/// Schema definition for a component type.
#[derive(Clone, Debug, PartialEq)]
pub struct ComponentSchema {
    /// Component name.
    pub name: String,
    /// Field definitions in declaration order.
    pub fields: Vec<FieldSchema>,
}

impl ComponentSchema {
    /// Creates a new component schema with no fields.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Builds a schema from an IR component declaration.
    #[must_use]
    pub fn from_def(def: &ComponentDef) -> Self {
        Self {
            name: def.name.clone(),
            fields: def
                .fields
                .iter()
                .map(|f| FieldSchema::new(f.name.clone(), f.field_type.clone(), f.default.clone()))
                .collect(),
        }
    }

    /// Adds a field to the schema.
    #[must_use]
    pub fn with_field(mut self, field: FieldSchema) -> Self {
        self.upsert_field(field);
        self
    }

    /// Returns the field schema by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Adds a field, or replaces the one with the same name in place.
    pub fn upsert_field(&mut self, field: FieldSchema) {
        match self.fields.iter_mut().find(|f| f.name == field.name) {
            Some(existing) => *existing = field,
            None => self.fields.push(field),
        }
    }

    /// Returns a fresh record holding every field's default.
    #[must_use]
    pub fn defaults(&self) -> Record {
        self.fields
            .iter()
            .map(|f| (f.name.clone(), f.default.clone()))
            .collect()
    }

    /// Builds a record from defaults overlaid with explicit values.
    ///
    /// Explicit values are coerced to their declared field type. Names the
    /// schema does not declare are kept as given.
    #[must_use]
    pub fn instantiate<'a, I>(&self, init: I) -> Record
    where
        I: IntoIterator<Item = (&'a String, &'a Value)>,
    {
        let mut record = self.defaults();
        for (name, value) in init {
            let value = self.coerce(name, value.clone());
            record.insert_mut(name.clone(), value);
        }
        record
    }

    /// Coerces a value for the named field. Unknown fields pass through.
    #[must_use]
    pub fn coerce(&self, field: &str, value: Value) -> Value {
        match self.field(field) {
            Some(schema) => schema.ty.coerce(value),
            None => value,
        }
    }
}

/// Schema definition for a component field.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldSchema {
    /// Field name.
    pub name: String,
    /// Declared type.
    pub ty: FieldType,
    /// Default value, already coerced to `ty`.
    pub default: Value,
}

impl FieldSchema {
    /// Creates a field. A missing default becomes the type's zero value.
    #[must_use]
    pub fn new(name: impl Into<String>, ty: FieldType, default: Option<Value>) -> Self {
        let default = match default {
            Some(value) => ty.coerce(value),
            None => ty.zero_value(),
        };
        Self {
            name: name.into(),
            ty,
            default,
        }
    }
}
