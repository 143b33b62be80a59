//! Path-addressed access to nested JSON values.
//!
//! Paths are [`FieldPath`]s. A numeric segment addresses an array index
//! when the container is an array and an object key otherwise.

use ism_model::{FieldPath, ModelError, segment_index};
use serde_json::{Map, Value};

use crate::error::Result;

/// Largest number of `null` entries a single write may pad an array with.
pub const MAX_ARRAY_GAP: usize = 1024;

/// Value at `path`, `None` when any segment is missing.
pub fn get<'a>(root: &'a Value, path: &FieldPath) -> Option<&'a Value> {
    path.segments()
        .iter()
        .try_fold(root, |current, segment| match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment_index(segment).and_then(|i| items.get(i)),
            _ => None,
        })
}

/// Mutable value at `path`, `None` when any segment is missing.
pub fn get_mut<'a>(root: &'a mut Value, path: &FieldPath) -> Option<&'a mut Value> {
    path.segments()
        .iter()
        .try_fold(root, |current, segment| match current {
            Value::Object(map) => map.get_mut(segment),
            Value::Array(items) => segment_index(segment).and_then(|i| items.get_mut(i)),
            _ => None,
        })
}

pub fn contains(root: &Value, path: &FieldPath) -> bool {
    get(root, path).is_some()
}

/// Place `value` at `path`, creating intermediate containers.
///
/// A missing intermediate becomes an array when the following segment is
/// numeric and an object otherwise. Scalars standing where a container is
/// needed are replaced. Writing past the end of an array pads it with
/// `null`, at most [`MAX_ARRAY_GAP`] entries; an index further out is an
/// `InvalidPath` error and leaves `root` untouched. An array addressed by a
/// non-numeric key is turned into an object keyed by the former indices.
pub fn set(root: &mut Value, path: &FieldPath, value: Value) -> Result<()> {
    let segments = path.segments();
    let Some((last, parents)) = segments.split_last() else {
        return Ok(());
    };
    if !fits(root, segments) {
        let err = ModelError::invalid_path(path.dotted(), "array index too far past the end");
        return Err(err.into());
    }
    let mut current = root;
    for (i, segment) in parents.iter().enumerate() {
        let next = &segments[i + 1];
        let slot = child_slot(current, segment);
        if !slot.is_object() && !slot.is_array() {
            *slot = empty_container(next);
        }
        current = slot;
    }
    *child_slot(current, last) = value;
    Ok(())
}

/// Whether every numeric segment that would address an array stays within
/// [`MAX_ARRAY_GAP`] of its end.
fn fits(root: &Value, segments: &[String]) -> bool {
    let mut current = Some(root);
    for segment in segments {
        let Some(index) = segment_index(segment) else {
            current = current.and_then(|value| value.get(segment.as_str()));
            continue;
        };
        match current {
            Some(Value::Array(items)) => {
                if index.saturating_sub(items.len()) > MAX_ARRAY_GAP {
                    return false;
                }
                current = items.get(index);
            }
            Some(Value::Object(map)) => current = map.get(segment.as_str()),
            // A fresh array is created here.
            _ => {
                if index > MAX_ARRAY_GAP {
                    return false;
                }
                current = None;
            }
        }
    }
    true
}

/// Remove the entry at `path` and return it.
///
/// The containing object stays in place even when it ends up empty. Array
/// entries are replaced by `null` so sibling indices keep their meaning.
/// Missing paths and out-of-range indices are a no-op.
pub fn unset(root: &mut Value, path: &FieldPath) -> Option<Value> {
    let leaf = path.leaf();
    let container = match path.parent() {
        Some(parent) => get_mut(root, &parent)?,
        None => root,
    };
    match container {
        Value::Object(map) => map.shift_remove(leaf),
        Value::Array(items) => {
            let index = segment_index(leaf)?;
            items.get_mut(index).map(Value::take)
        }
        _ => None,
    }
}

fn empty_container(segment: &str) -> Value {
    if segment_index(segment).is_some() {
        Value::Array(Vec::new())
    } else {
        Value::Object(Map::new())
    }
}

/// Make `current` a container able to hold `segment` and return the slot.
fn child_slot<'a>(current: &'a mut Value, segment: &str) -> &'a mut Value {
    let index = segment_index(segment);
    if current.is_array() && index.is_none() {
        if let Value::Array(items) = current.take() {
            let map: Map<String, Value> = items
                .into_iter()
                .enumerate()
                .map(|(i, v)| (i.to_string(), v))
                .collect();
            *current = Value::Object(map);
        }
    } else if !current.is_array() && !current.is_object() {
        *current = empty_container(segment);
    }

    match current {
        Value::Array(items) => {
            let index = index.unwrap_or(items.len());
            if items.len() <= index {
                items.resize(index + 1, Value::Null);
            }
            &mut items[index]
        }
        Value::Object(map) => map.entry(segment.to_string()).or_insert(Value::Null),
        // Normalized above: only arrays and objects reach this match.
        other => other,
    }
}
