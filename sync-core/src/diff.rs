//! Shallow differential patches between JSON snapshots.
//!
//! Diffing is deliberately one level deep: a key whose value is a nested
//! object is compared as a whole and reported as a single `modify` patch,
//! never decomposed into sub-paths. Applying patches copies only the top
//! level of the input, so nested values in the result share nothing with
//! the caller's value but are not re-diffed either; treat the returned
//! snapshot as the new source of truth.
//!
//! Non-object inputs (including `null`) are treated as empty snapshots.

use serde_json::{Map, Value};
use sync_types::DiffPatch;

/// Compute the patches that turn `old` into `new`.
///
/// Adds and modifies come first, in `new`'s key order, followed by deletes
/// in `old`'s key order. Values are compared structurally.
pub fn generate_diff_patches(old: &Value, new: &Value) -> Vec<DiffPatch> {
    let empty = Map::new();
    let old = old.as_object().unwrap_or(&empty);
    let new = new.as_object().unwrap_or(&empty);

    let mut patches = Vec::new();

    for (key, value) in new {
        match old.get(key) {
            None => patches.push(DiffPatch::Add {
                path: key.clone(),
                value: value.clone(),
            }),
            Some(previous) if previous != value => patches.push(DiffPatch::Modify {
                path: key.clone(),
                value: value.clone(),
                old_value: Some(previous.clone()),
            }),
            Some(_) => {}
        }
    }

    for (key, previous) in old {
        if !new.contains_key(key) {
            patches.push(DiffPatch::Delete {
                path: key.clone(),
                old_value: Some(previous.clone()),
            });
        }
    }

    patches
}

/// Apply `patches` in order to a shallow copy of `data`.
///
/// Dot-separated paths walk into nested objects. Missing intermediates and
/// empty ones (`null`, `false`, `0`, `""`) are replaced by a fresh object. A
/// patch whose path runs through any other non-object value is skipped.
///
/// Deleting a key keeps the remaining keys in their original order.
pub fn apply_diff_patches(data: &Value, patches: &[DiffPatch]) -> Value {
    let mut result = data.as_object().cloned().unwrap_or_default();

    for patch in patches {
        let mut segments: Vec<&str> = patch.path().split('.').collect();
        let Some(last) = segments.pop() else {
            continue;
        };
        let Some(target) = walk_to_parent(&mut result, &segments) else {
            continue;
        };

        match patch {
            DiffPatch::Add { value, .. } | DiffPatch::Modify { value, .. } => {
                target.insert(last.to_string(), value.clone());
            }
            DiffPatch::Delete { .. } => {
                target.shift_remove(last);
            }
        }
    }

    Value::Object(result)
}

fn walk_to_parent<'a>(
    root: &'a mut Map<String, Value>,
    segments: &[&str],
) -> Option<&'a mut Map<String, Value>> {
    let mut current = root;
    for segment in segments {
        let slot = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if is_empty_scalar(slot) {
            *slot = Value::Object(Map::new());
        }
        current = slot.as_object_mut()?;
    }
    Some(current)
}

fn is_empty_scalar(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}
