//! Integration tests for Layer 0: Foundation
//!
//! Tests for core types: Value, EntityId, FieldType, Error, and persistent collections.

mod collections;
mod errors;
mod values;
