//! Validated entry points for reading and writing IR modules.

use cadence_foundation::{Error, Result};
use tracing::debug;

use crate::module::IrModule;
use crate::validate::validate_document;

/// Parses and validates a module from JSON text.
///
/// # Errors
///
/// Returns `InvalidIr` for malformed JSON or structure and
/// `UnsupportedVersion` for a newer major version.
pub fn load_json(text: &str) -> Result<IrModule> {
    let doc: serde_json::Value = serde_json::from_str(text)
        .map_err(|e| Error::invalid_ir(format!("malformed JSON: {e}")))?;
    load_value(doc)
}

/// Validates and converts an already-parsed JSON document.
///
/// # Errors
///
/// See [`load_json`].
pub fn load_value(doc: serde_json::Value) -> Result<IrModule> {
    let version = validate_document(&doc)?;
    let module: IrModule =
        serde_json::from_value(doc).map_err(|e| Error::invalid_ir(e.to_string()))?;
    check_semantics(&module)?;
    debug!(
        module = %module.module,
        %version,
        components = module.components.len(),
        rules = module.rules.len(),
        functions = module.functions.len(),
        "loaded IR module"
    );
    Ok(module)
}

/// Parses and validates a module from its MessagePack form.
///
/// # Errors
///
/// Returns `InvalidIr` if the bytes do not decode, then as [`load_value`].
pub fn load_msgpack(bytes: &[u8]) -> Result<IrModule> {
    let doc: serde_json::Value = rmp_serde::from_slice(bytes)
        .map_err(|e| Error::invalid_ir(format!("malformed MessagePack: {e}")))?;
    load_value(doc)
}

/// Encodes a module as MessagePack with named fields.
///
/// # Errors
///
/// Returns `Serialization` if encoding fails.
pub fn to_msgpack(module: &IrModule) -> Result<Vec<u8>> {
    rmp_serde::to_vec_named(module).map_err(|e| Error::serialization(e.to_string()))
}

/// Checks that serde's shape checks cannot express.
fn check_semantics(module: &IrModule) -> Result<()> {
    for (i, rule) in module.rules.iter().enumerate() {
        if rule.trigger.kind != "event" {
            return Err(Error::invalid_ir(format!(
                "rules[{i}].trigger: unsupported trigger type `{}`",
                rule.trigger.kind
            )));
        }
    }
    for (i, entity) in module.initial_entities().iter().enumerate() {
        let Some(id) = entity.id else { continue };
        if module.initial_entities()[..i].iter().any(|e| e.id == Some(id)) {
            return Err(Error::invalid_ir(format!(
                "initial_state.entities[{i}]: duplicate entity id {id}"
            )));
        }
    }
    Ok(())
}
