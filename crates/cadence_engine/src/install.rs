//! Installing a loaded module into world and rule tables.

use cadence_foundation::{EntityId, Result};
use cadence_ir::{EntityDef, IrModule};
use cadence_storage::{ComponentSchema, World};
use tracing::{debug, info};

use crate::rules::RuleSet;

/// Counts of what an install added.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InstallReport {
    /// Component schemas registered.
    pub components: usize,
    /// Rules added.
    pub rules: usize,
    /// Functions added.
    pub functions: usize,
    /// Initial entities created.
    pub entities: usize,
}

/// Registers a module's schemas, rules, functions and constants, then spawns
/// its initial entities.
///
/// # Errors
///
/// Returns an error if an initial entity cannot be created, for example
/// because its explicit id is already live.
pub fn install(module: &IrModule, world: &mut World, rules: &mut RuleSet) -> Result<InstallReport> {
    let mut report = InstallReport::default();

    for def in &module.components {
        world.register_component(ComponentSchema::from_def(def));
        report.components += 1;
    }
    for def in &module.rules {
        rules.add_rule(def.clone());
        report.rules += 1;
    }
    for def in &module.functions {
        if rules.add_function(def.clone()) {
            report.functions += 1;
        }
    }
    for (name, value) in &module.constants {
        rules.add_constant(name.clone(), value.clone());
    }

    report.entities = spawn_entities(world, module.initial_entities())?.len();

    info!(
        module = %module.module,
        components = report.components,
        rules = report.rules,
        functions = report.functions,
        entities = report.entities,
        "module installed"
    );
    Ok(report)
}

/// Creates entities from definitions, in order. Explicit ids are honoured;
/// others are allocated.
///
/// # Errors
///
/// Returns `EntityExists` if an explicit id is already live.
pub fn spawn_entities(world: &mut World, defs: &[EntityDef]) -> Result<Vec<EntityId>> {
    let mut created = Vec::with_capacity(defs.len());
    for def in defs {
        created.push(spawn_entity(world, def)?);
    }
    Ok(created)
}

/// Creates a single entity from its definition.
///
/// # Errors
///
/// Returns `EntityExists` if the explicit id is already live.
pub fn spawn_entity(world: &mut World, def: &EntityDef) -> Result<EntityId> {
    let id = match def.id {
        Some(raw) => {
            let id = EntityId::new(raw);
            world.create_entity_with_id(id)?;
            id
        }
        None => world.create_entity(),
    };
    if let Some(name) = &def.name {
        world.set_name(id, name.clone())?;
    }
    for (component, fields) in &def.components {
        world.add_component(id, component, fields.iter())?;
    }
    for (name, function) in &def.bound_functions {
        world.set_bound_function(id, name.clone(), function.clone())?;
    }
    debug!(entity = %id, name = ?def.name, "spawned initial entity");
    Ok(id)
}
