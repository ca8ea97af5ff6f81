//! # Generic Documents
//!
//! Accessors over untyped remote objects (`serde_json::Value`) for the handful of
//! fields the applier needs, plus the canonical serialization used for the
//! last-applied annotation.

use kube::core::GroupVersionKind;
use serde_json::{Map, Value};

/// Rebuild `value` with every object's keys in sorted order
pub fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut sorted = Map::new();
            for key in keys {
                sorted.insert(key.clone(), canonicalize(&map[key]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

/// Deterministic serialization: sorted keys, no whitespace.
///
/// Serializing the same logical document twice always yields the same bytes.
pub fn canonical_json(value: &Value) -> Result<String, serde_json::Error> {
    serde_json::to_string(&canonicalize(value))
}

pub fn name(doc: &Value) -> Option<&str> {
    doc.pointer("/metadata/name").and_then(Value::as_str)
}

/// Namespace of the document, `None` when absent or empty
pub fn namespace(doc: &Value) -> Option<&str> {
    doc.pointer("/metadata/namespace")
        .and_then(Value::as_str)
        .filter(|ns| !ns.is_empty())
}

pub fn kind(doc: &Value) -> Option<&str> {
    doc.get("kind").and_then(Value::as_str)
}

pub fn annotations(doc: &Value) -> Option<&Map<String, Value>> {
    doc.pointer("/metadata/annotations").and_then(Value::as_object)
}

pub fn annotation<'a>(doc: &'a Value, key: &str) -> Option<&'a str> {
    annotations(doc)
        .and_then(|annotations| annotations.get(key))
        .and_then(Value::as_str)
}

/// Set an annotation, creating `metadata.annotations` as needed.
///
/// Returns false when the document is not an object.
pub fn set_annotation(doc: &mut Value, key: &str, value: &str) -> bool {
    let Some(annotations) = object_at(doc, &["metadata", "annotations"]) else {
        return false;
    };
    annotations.insert(key.to_string(), Value::String(value.to_string()));
    true
}

pub fn resource_version(doc: &Value) -> Option<&str> {
    doc.pointer("/metadata/resourceVersion")
        .and_then(Value::as_str)
}

pub fn set_resource_version(doc: &mut Value, version: &str) -> bool {
    let Some(metadata) = object_at(doc, &["metadata"]) else {
        return false;
    };
    metadata.insert(
        "resourceVersion".to_string(),
        Value::String(version.to_string()),
    );
    true
}

/// Copy of `doc` without the annotation `key`; an annotation map left empty is dropped
pub fn without_annotation(doc: &Value, key: &str) -> Value {
    let mut copy = doc.clone();
    if let Some(metadata) = copy.get_mut("metadata").and_then(Value::as_object_mut) {
        let now_empty = match metadata.get_mut("annotations").and_then(Value::as_object_mut) {
            Some(annotations) => {
                annotations.remove(key);
                annotations.is_empty()
            }
            None => false,
        };
        if now_empty {
            metadata.remove("annotations");
        }
    }
    copy
}

/// Split an `apiVersion` into group and version; the core group is empty
pub fn parse_api_version(api_version: &str) -> (&str, &str) {
    match api_version.split_once('/') {
        Some((group, version)) => (group, version),
        None => ("", api_version),
    }
}

/// Group/version/kind declared by the document
pub fn group_version_kind(doc: &Value) -> Option<GroupVersionKind> {
    let api_version = doc.get("apiVersion").and_then(Value::as_str)?;
    let kind = kind(doc)?;
    let (group, version) = parse_api_version(api_version);
    if version.is_empty() || kind.is_empty() {
        return None;
    }
    Some(GroupVersionKind::gvk(group, version, kind))
}

/// Walk (creating as needed) nested objects along `path`
fn object_at<'a>(doc: &'a mut Value, path: &[&str]) -> Option<&'a mut Map<String, Value>> {
    let mut current = doc.as_object_mut()?;
    for segment in path {
        let entry = current
            .entry((*segment).to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if entry.is_null() {
            *entry = Value::Object(Map::new());
        }
        current = entry.as_object_mut()?;
    }
    Some(current)
}
