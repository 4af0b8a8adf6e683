//! Merging of OpenAPI documents.
//!
//! The API serves a base document describing its fixed endpoints, and one
//! custom fragment per SDK client describing the project's own resources.
//! The generator consumes the combination of both.

use std::collections::HashSet;

use serde_json::{Map, Value};

/// Merge `custom` into a copy of `base`.
///
/// * `paths`: custom entries replace or add to base entries.
/// * `components.<kind>`: merged key by key, custom wins.
/// * `tags`: base tags first, then custom tags whose `name` is not yet present.
///   Tags without a string `name` are dropped from the custom side.
///
/// Neither input is modified.
pub fn merge_specs(base: &Value, custom: &Value) -> Value {
    let mut merged = match base {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    };

    if let Some(paths) = custom.get("paths").and_then(Value::as_object) {
        merge_map_into(&mut merged, "paths", paths);
    }

    if let Some(components) = custom.get("components").and_then(Value::as_object) {
        let mut target = take_object(&mut merged, "components");
        for (kind, entries) in components {
            match entries.as_object() {
                Some(entries) => merge_map_into(&mut target, kind, entries),
                None => tracing::debug!(kind = %kind, "Skipping non-object component section"),
            }
        }
        merged.insert("components".to_string(), Value::Object(target));
    }

    if let Some(custom_tags) = custom.get("tags").and_then(Value::as_array) {
        let mut tags = merged
            .get("tags")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let mut seen: HashSet<String> = tags.iter().filter_map(tag_name).collect();
        for tag in custom_tags {
            if let Some(name) = tag_name(tag) {
                if seen.insert(name) {
                    tags.push(tag.clone());
                }
            }
        }
        merged.insert("tags".to_string(), Value::Array(tags));
    }

    Value::Object(merged)
}

fn tag_name(tag: &Value) -> Option<String> {
    tag.get("name").and_then(Value::as_str).map(str::to_string)
}

/// Removes the object stored at `key`; anything else is discarded.
fn take_object(map: &mut Map<String, Value>, key: &str) -> Map<String, Value> {
    match map.remove(key) {
        Some(Value::Object(inner)) => inner,
        _ => Map::new(),
    }
}

fn merge_map_into(parent: &mut Map<String, Value>, key: &str, entries: &Map<String, Value>) {
    let mut target = take_object(parent, key);
    for (k, v) in entries {
        target.insert(k.clone(), v.clone());
    }
    parent.insert(key.to_string(), Value::Object(target));
}
