//! Integration tests for Layer 2: Storage
//!
//! Tests for entity allocation, component records, schemas, and snapshots.

mod components;
mod snapshots;
