//! Integration tests for snapshots and entity cloning

use cadence_foundation::{FieldType, Value};
use cadence_ir::{BoundFunction, Expr};
use cadence_storage::{ComponentSchema, FieldSchema, World};

fn world_with_inventory() -> (World, cadence_foundation::EntityId) {
    let mut world = World::new();
    world.register_component(ComponentSchema::new("Inventory").with_field(FieldSchema::new(
        "items",
        FieldType::list(FieldType::String),
        None,
    )));
    let id = world.create_entity();
    world
        .set_field(id, "Inventory", "items", Value::from(vec!["sword", "shield"]))
        .unwrap();
    (world, id)
}

#[test]
fn snapshot_is_detached_from_later_writes() {
    let (mut world, id) = world_with_inventory();
    let snapshot = world.snapshot(1.5);

    world.set_field(id, "Inventory", "items", Value::from(Vec::<&str>::new())).unwrap();
    assert_eq!(
        snapshot.field(id, "Inventory", "items"),
        Some(&Value::from(vec!["sword", "shield"]))
    );
    assert!((snapshot.time - 1.5).abs() < f64::EPSILON);
}

#[test]
fn snapshot_lists_names_and_bound_functions() {
    let (mut world, id) = world_with_inventory();
    world.set_name(id, "pack").unwrap();
    let function = BoundFunction {
        params: Vec::new(),
        return_type: None,
        body: Expr::literal(1),
        source: None,
    };
    world.set_bound_function(id, "weight", function).unwrap();

    let snapshot = world.snapshot(0.0);
    let entity = snapshot.entity(id).unwrap();
    assert_eq!(entity.name.as_deref(), Some("pack"));
    assert_eq!(entity.bound_functions, vec!["weight".to_string()]);
}

#[test]
fn clone_copies_components_and_bound_functions() {
    let (mut world, id) = world_with_inventory();
    let function = BoundFunction {
        params: Vec::new(),
        return_type: None,
        body: Expr::literal(2),
        source: None,
    };
    world.set_bound_function(id, "weight", function).unwrap();

    let copy = world.clone_entity(id, None).unwrap();
    assert_ne!(copy, id);
    assert_eq!(world.get_component(copy, "Inventory"), world.get_component(id, "Inventory"));
    assert!(world.bound_function(copy, "weight").is_some());

    world.set_field(copy, "Inventory", "items", Value::from(vec!["bow"])).unwrap();
    assert_eq!(
        world.get_field(id, "Inventory", "items"),
        Some(&Value::from(vec!["sword", "shield"]))
    );
}
