//! Entity-bound function lookup.
//!
//! A bound function is attached to exactly one entity. Resolution never
//! falls back to module functions or builtins: a missing name is an error,
//! so the IR producer finds out rather than silently getting a default.

use cadence_foundation::{EntityId, Error, FieldType, Result};
use cadence_ir::{BoundFunction, Param};
use cadence_storage::World;

/// Resolves a bound function on an entity.
///
/// # Errors
///
/// Returns `EntityNotFound` if the entity is not live and
/// `UnknownBoundFunction` if it carries no function of that name.
pub fn resolve<'w>(world: &'w World, entity: EntityId, name: &str) -> Result<&'w BoundFunction> {
    world.validate(entity)?;
    world
        .bound_function(entity, name)
        .ok_or_else(|| Error::unknown_bound_function(entity, name))
}

/// Signature of a bound function, for introspection.
#[derive(Clone, Debug, PartialEq)]
pub struct BoundFunctionInfo {
    /// Function name.
    pub name: String,
    /// Declared parameters.
    pub params: Vec<Param>,
    /// Declared return type.
    pub return_type: Option<FieldType>,
    /// Source text the function was compiled from, if the producer kept it.
    pub source: Option<String>,
}

/// Lists an entity's bound functions in attachment order.
#[must_use]
pub fn describe(world: &World, entity: EntityId) -> Vec<BoundFunctionInfo> {
    world
        .bound_function_names(entity)
        .into_iter()
        .filter_map(|name| {
            let function = world.bound_function(entity, name)?;
            Some(BoundFunctionInfo {
                name: name.to_string(),
                params: function.params.clone(),
                return_type: function.return_type.clone(),
                source: function.source.clone(),
            })
        })
        .collect()
}
