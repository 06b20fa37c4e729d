//! Integration tests for component records, schemas, and queries

use cadence_foundation::{EntityId, FieldType, Value};
use cadence_storage::{ComponentSchema, FieldSchema, World};

fn world() -> World {
    let mut world = World::new();
    world.register_component(
        ComponentSchema::new("Health")
            .with_field(FieldSchema::new("current", FieldType::Integer, Some(Value::Int(100))))
            .with_field(FieldSchema::new("max", FieldType::Integer, None)),
    );
    world.register_component(
        ComponentSchema::new("Position")
            .with_field(FieldSchema::new("x", FieldType::Float, None))
            .with_field(FieldSchema::new("y", FieldType::Float, None)),
    );
    world
}

#[test]
fn attach_fills_defaults_and_coerces() {
    let mut world = world();
    let id = world.create_entity();
    let init = [("max".to_string(), Value::Float(9.7))];
    world
        .add_component(id, "Health", init.iter().map(|(k, v)| (k, v)))
        .unwrap();

    assert_eq!(world.get_field(id, "Health", "current"), Some(&Value::Int(100)));
    assert_eq!(world.get_field(id, "Health", "max"), Some(&Value::Int(9)));
}

#[test]
fn set_field_coerces_and_attaches() {
    let mut world = world();
    let id = world.create_entity();
    world.set_field(id, "Health", "current", Value::Float(3.75)).unwrap();
    assert_eq!(world.get_field(id, "Health", "current"), Some(&Value::Int(3)));
    // Attached from defaults on first write.
    assert_eq!(world.get_field(id, "Health", "max"), Some(&Value::Int(0)));
}

#[test]
fn writes_to_missing_entities_fail() {
    let mut world = world();
    assert!(world.set_field(EntityId::new(99), "Health", "current", Value::Int(1)).is_err());
}

#[test]
fn query_intersects_components_in_id_order() {
    let mut world = world();
    let a = world.create_entity();
    let b = world.create_entity();
    let c = world.create_entity();
    for id in [a, b, c] {
        world.add_component(id, "Health", std::iter::empty()).unwrap();
    }
    for id in [c, a] {
        world.add_component(id, "Position", std::iter::empty()).unwrap();
    }

    let both = ["Health".to_string(), "Position".to_string()];
    assert_eq!(world.query(&both), vec![a, c]);
    assert_eq!(world.query(&["Missing".to_string()]), Vec::<EntityId>::new());
    assert_eq!(world.query(&[]), vec![a, b, c]);
}

#[test]
fn remove_component() {
    let mut world = world();
    let id = world.create_entity();
    world.add_component(id, "Position", std::iter::empty()).unwrap();
    assert!(world.remove_component(id, "Position").unwrap());
    assert!(!world.remove_component(id, "Position").unwrap());
    assert!(!world.has_component(id, "Position"));
}

#[test]
fn merge_field_backfills_existing_instances() {
    let mut world = world();
    let id = world.create_entity();
    world.add_component(id, "Position", std::iter::empty()).unwrap();

    world.merge_field("Position", FieldSchema::new("z", FieldType::Float, Some(Value::Float(1.5))));
    assert_eq!(world.get_field(id, "Position", "z"), Some(&Value::Float(1.5)));
}

#[test]
fn merge_field_retypes_existing_values() {
    let mut world = world();
    let id = world.create_entity();
    world.set_field(id, "Position", "x", Value::Float(2.9)).unwrap();

    world.merge_field("Position", FieldSchema::new("x", FieldType::Integer, None));
    assert_eq!(world.field_type("Position", "x"), Some(&FieldType::Integer));
    assert_eq!(world.get_field(id, "Position", "x"), Some(&Value::Int(2)));
}

#[test]
fn components_listed_by_name() {
    let mut world = world();
    let id = world.create_entity();
    world.add_component(id, "Position", std::iter::empty()).unwrap();
    world.add_component(id, "Health", std::iter::empty()).unwrap();
    let names: Vec<&str> = world.components_of(id).collect();
    assert_eq!(names, ["Health", "Position"]);
}
