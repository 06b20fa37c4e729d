//! Live merge of an additional module into a loaded instance.
//!
//! Merging is planned against the current tables first and applied only if
//! the plan is conflict-free, so a rejected merge leaves everything as it
//! was.

use cadence_foundation::{EntityId, Error, Result};
use cadence_ir::{EntityDef, IrModule, RuleDef};
use cadence_storage::{ComponentSchema, FieldSchema, World};
use tracing::{debug, info, warn};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::install;
use crate::rules::RuleSet;

/// Merge behaviour switches.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MergeOptions {
    /// Let an incoming field type replace a conflicting existing one.
    pub override_types: bool,
    /// Shift every incoming rule id past the existing ones if any collides.
    pub shift_ids: bool,
    /// Create the incoming module's initial entities.
    pub merge_entities: bool,
}

impl MergeOptions {
    /// Creates the default options: no overrides, no shifting, no entities.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `override_types`.
    #[must_use]
    pub fn with_override_types(mut self, enabled: bool) -> Self {
        self.override_types = enabled;
        self
    }

    /// Sets `shift_ids`.
    #[must_use]
    pub fn with_shift_ids(mut self, enabled: bool) -> Self {
        self.shift_ids = enabled;
        self
    }

    /// Sets `merge_entities`.
    #[must_use]
    pub fn with_merge_entities(mut self, enabled: bool) -> Self {
        self.merge_entities = enabled;
        self
    }
}

/// What a merge changed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Components that did not exist before.
    pub components_added: usize,
    /// Fields added to existing components.
    pub fields_added: usize,
    /// Existing fields whose type was overridden.
    pub fields_retyped: usize,
    /// Rules appended.
    pub rules_added: usize,
    /// Functions appended.
    pub functions_added: usize,
    /// Incoming functions ignored because the name was taken.
    pub functions_shadowed: usize,
    /// Entities created.
    pub entities_added: usize,
    /// Incoming entities skipped because their id is live.
    pub entities_skipped: usize,
    /// Amount added to incoming rule ids, if they were shifted.
    pub id_offset: u64,
}

enum ComponentChange {
    Register(ComponentSchema),
    Fields(String, Vec<FieldChange>),
}

struct FieldChange {
    schema: FieldSchema,
    retype: bool,
}

/// Merges `module` into the current world and rule tables.
///
/// # Errors
///
/// Returns `MergeConflict` if an incoming field redeclares an existing field
/// with a different type and `override_types` is off. Nothing is changed in
/// that case.
pub fn merge(
    module: &IrModule,
    world: &mut World,
    rules: &mut RuleSet,
    options: MergeOptions,
) -> Result<MergeReport> {
    let mut report = MergeReport::default();

    // Plan.
    let changes = plan_components(module, world, options)?;
    report.id_offset = plan_id_offset(module, rules, options);
    let entities = if options.merge_entities {
        plan_entities(module.initial_entities(), world, &mut report)
    } else {
        Vec::new()
    };

    // Apply.
    for change in changes {
        match change {
            ComponentChange::Register(schema) => {
                debug!(component = %schema.name, "merge: new component");
                world.register_component(schema);
                report.components_added += 1;
            }
            ComponentChange::Fields(component, fields) => {
                for FieldChange { schema, retype } in fields {
                    if retype {
                        report.fields_retyped += 1;
                    } else {
                        report.fields_added += 1;
                    }
                    world.merge_field(&component, schema);
                }
            }
        }
    }

    for def in &module.rules {
        rules.add_rule(shifted(def, report.id_offset));
        report.rules_added += 1;
    }
    for def in &module.functions {
        if rules.add_function(def.clone()) {
            report.functions_added += 1;
        } else {
            report.functions_shadowed += 1;
        }
    }
    for (name, value) in &module.constants {
        rules.add_constant(name.clone(), value.clone());
    }
    for def in entities {
        install::spawn_entity(world, def)?;
        report.entities_added += 1;
    }

    info!(module = %module.module, ?report, "module merged");
    Ok(report)
}

fn plan_components(
    module: &IrModule,
    world: &World,
    options: MergeOptions,
) -> Result<Vec<ComponentChange>> {
    let mut changes = Vec::new();
    for def in &module.components {
        let Some(existing) = world.component_schema(&def.name) else {
            changes.push(ComponentChange::Register(ComponentSchema::from_def(def)));
            continue;
        };

        let mut fields = Vec::new();
        for field in &def.fields {
            let incoming = FieldSchema::new(
                field.name.clone(),
                field.field_type.clone(),
                field.default.clone(),
            );
            match existing.field(&field.name) {
                None => fields.push(FieldChange {
                    schema: incoming,
                    retype: false,
                }),
                Some(current) if current.ty == incoming.ty => {}
                Some(current) => {
                    if !options.override_types {
                        return Err(Error::merge_conflict(
                            &def.name,
                            &field.name,
                            current.ty.clone(),
                            incoming.ty,
                        ));
                    }
                    warn!(
                        component = %def.name,
                        field = %field.name,
                        from = %current.ty,
                        to = %incoming.ty,
                        "merge: overriding field type"
                    );
                    fields.push(FieldChange {
                        schema: incoming,
                        retype: true,
                    });
                }
            }
        }
        if !fields.is_empty() {
            changes.push(ComponentChange::Fields(def.name.clone(), fields));
        }
    }
    Ok(changes)
}

fn plan_id_offset(module: &IrModule, rules: &RuleSet, options: MergeOptions) -> u64 {
    let collides = module
        .rules
        .iter()
        .filter_map(|r| r.id)
        .any(|id| rules.has_rule_id(id));
    if !collides {
        return 0;
    }
    if !options.shift_ids {
        warn!(module = %module.module, "merge: incoming rule ids collide with loaded rules");
        return 0;
    }
    rules.max_rule_id().map_or(0, |max| max + 1)
}

fn plan_entities<'m>(
    defs: &'m [EntityDef],
    world: &World,
    report: &mut MergeReport,
) -> Vec<&'m EntityDef> {
    defs.iter()
        .filter(|def| match def.id.map(EntityId::new) {
            Some(id) if world.has_entity(id) => {
                warn!(entity = %id, "merge: entity already exists; skipping");
                report.entities_skipped += 1;
                false
            }
            _ => true,
        })
        .collect()
}

fn shifted(def: &RuleDef, offset: u64) -> RuleDef {
    let mut def = def.clone();
    if offset > 0 {
        def.id = def.id.map(|id| id + offset);
    }
    def
}
