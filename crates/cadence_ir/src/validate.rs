//! Structural validation of raw IR documents.
//!
//! Runs on the untyped JSON tree before deserialization so that errors name
//! the offending path (`rules[2].actions`) instead of a serde position.

use cadence_foundation::{Error, Result};
use serde_json::{Map, Value as Json};
use tracing::debug;

use crate::version::Version;

/// Validates the shape of a raw IR document and returns its version.
///
/// Checks that `version` and `module` are present, that the major version is
/// supported, and that every required array exists on the module and on each
/// component, rule and function. Legacy `trackers` are tolerated.
///
/// # Errors
///
/// Returns `UnsupportedVersion` for a newer major version and `InvalidIr`
/// for every other structural problem.
pub fn validate_document(doc: &Json) -> Result<Version> {
    let root = doc
        .as_object()
        .ok_or_else(|| Error::invalid_ir("module must be an object"))?;

    let version = require_str(root, "version", "module")?;
    let version = Version::check(version)?;
    require_str(root, "module", "module")?;

    for key in ["components", "rules", "functions"] {
        require_array(root, key, "module")?;
    }

    for (i, component) in array(root, "components").iter().enumerate() {
        let path = format!("components[{i}]");
        let component = as_object(component, &path)?;
        require_str(component, "name", &path)?;
        for (j, field) in require_array(component, "fields", &path)?.iter().enumerate() {
            let field_path = format!("{path}.fields[{j}]");
            let field = as_object(field, &field_path)?;
            require_str(field, "name", &field_path)?;
            require(field, "type", &field_path)?;
        }
    }

    for (i, rule) in array(root, "rules").iter().enumerate() {
        let path = format!("rules[{i}]");
        let rule = as_object(rule, &path)?;
        let trigger = as_object(require(rule, "trigger", &path)?, &format!("{path}.trigger"))?;
        if trigger.get("type").and_then(Json::as_str) == Some("event") {
            require_str(trigger, "event", &format!("{path}.trigger"))?;
        }
        require_array(rule, "actions", &path)?;
        if let Some(filter) = rule.get("filter").filter(|f| !f.is_null()) {
            let filter_path = format!("{path}.filter");
            let filter = as_object(filter, &filter_path)?;
            require_array(filter, "components", &filter_path)?;
        }
    }

    for (i, function) in array(root, "functions").iter().enumerate() {
        let path = format!("functions[{i}]");
        let function = as_object(function, &path)?;
        require_str(function, "name", &path)?;
        require_array(function, "params", &path)?;
        require(function, "body", &path)?;
    }

    if let Some(state) = root.get("initial_state").filter(|s| !s.is_null()) {
        let state = as_object(state, "initial_state")?;
        require_array(state, "entities", "initial_state")?;
    }

    if root.get("trackers").is_some_and(|t| t.as_array().is_some_and(|a| !a.is_empty())) {
        debug!("ignoring legacy trackers");
    }

    Ok(version)
}

fn as_object<'a>(value: &'a Json, path: &str) -> Result<&'a Map<String, Json>> {
    value
        .as_object()
        .ok_or_else(|| Error::invalid_ir(format!("{path}: expected object")))
}

fn require<'a>(obj: &'a Map<String, Json>, key: &str, path: &str) -> Result<&'a Json> {
    obj.get(key)
        .filter(|v| !v.is_null())
        .ok_or_else(|| Error::invalid_ir(format!("{path}: missing required field `{key}`")))
}

fn require_str<'a>(obj: &'a Map<String, Json>, key: &str, path: &str) -> Result<&'a str> {
    require(obj, key, path)?
        .as_str()
        .ok_or_else(|| Error::invalid_ir(format!("{path}.{key}: expected string")))
}

fn require_array<'a>(obj: &'a Map<String, Json>, key: &str, path: &str) -> Result<&'a Vec<Json>> {
    require(obj, key, path)?
        .as_array()
        .ok_or_else(|| Error::invalid_ir(format!("{path}.{key}: expected array")))
}

fn array<'a>(obj: &'a Map<String, Json>, key: &str) -> &'a [Json] {
    obj.get(key)
        .and_then(Json::as_array)
        .map_or(&[], Vec::as_slice)
}
