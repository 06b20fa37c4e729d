//! `MessagePack` encoding of world snapshots.

use cadence_foundation::{Error, Result};
use cadence_storage::WorldSnapshot;

/// Encodes a snapshot with named fields.
///
/// # Errors
///
/// Returns a serialization error if encoding fails.
pub fn snapshot_to_bytes(snapshot: &WorldSnapshot) -> Result<Vec<u8>> {
    rmp_serde::to_vec_named(snapshot).map_err(|e| Error::serialization(e.to_string()))
}

/// Decodes a snapshot produced by [`snapshot_to_bytes`].
///
/// # Errors
///
/// Returns a serialization error if the bytes are not a snapshot.
pub fn snapshot_from_bytes(bytes: &[u8]) -> Result<WorldSnapshot> {
    rmp_serde::from_slice(bytes).map_err(|e| Error::serialization(e.to_string()))
}

/// Encodes a snapshot as pretty-printed JSON, for tooling.
///
/// # Errors
///
/// Returns a serialization error if encoding fails.
pub fn snapshot_to_json(snapshot: &WorldSnapshot) -> Result<String> {
    serde_json::to_string_pretty(snapshot).map_err(|e| Error::serialization(e.to_string()))
}
