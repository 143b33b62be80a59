//! Dirty diff between live and saved configurations.
//!
//! Lists of entries are reduced to maps keyed by an identity field, then
//! compared entry by entry. The result only gates the save/discard bar; the
//! save itself never consults it.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::warn;

/// How one identity differs between the two sides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "paths", rename_all = "snake_case")]
pub enum EntryChange {
    /// Present only in the current configuration.
    Added,
    /// Present only in the original configuration.
    Removed,
    /// Present in both with differing leaves (dotted paths inside the entry).
    Modified(Vec<String>),
}

/// Changed entries keyed by identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DirtyDiff {
    changes: BTreeMap<String, EntryChange>,
}

impl DirtyDiff {
    /// Number of changed entries, the "N unsaved changes" count.
    pub fn count(&self) -> usize {
        self.changes.len()
    }

    pub fn is_dirty(&self) -> bool {
        !self.changes.is_empty()
    }

    /// Identities of changed entries in key order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.changes.keys().map(String::as_str)
    }

    pub fn get(&self, identity: &str) -> Option<&EntryChange> {
        self.changes.get(identity)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &EntryChange)> {
        self.changes.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Key a list of entries by `identity_field`.
///
/// String identities are used verbatim, other scalars by their JSON text.
/// Entries without a usable identity are skipped.
pub fn diffable_map(list: &[Value], identity_field: &str) -> BTreeMap<String, Value> {
    let mut map = BTreeMap::new();
    for entry in list {
        let identity = match entry.get(identity_field) {
            Some(Value::String(s)) => s.clone(),
            Some(value @ (Value::Number(_) | Value::Bool(_))) => value.to_string(),
            _ => {
                warn!(identity_field, "entry without identity skipped in diff");
                continue;
            }
        };
        map.insert(identity, entry.clone());
    }
    map
}

/// Compare two identity-keyed maps.
pub fn diff_maps(current: &BTreeMap<String, Value>, original: &BTreeMap<String, Value>) -> DirtyDiff {
    let mut changes = BTreeMap::new();
    for (identity, value) in current {
        match original.get(identity) {
            None => {
                changes.insert(identity.clone(), EntryChange::Added);
            }
            Some(before) if before != value => {
                let mut paths = Vec::new();
                changed_leaves(value, before, "", &mut paths);
                changes.insert(identity.clone(), EntryChange::Modified(paths));
            }
            Some(_) => {}
        }
    }
    for identity in original.keys() {
        if !current.contains_key(identity) {
            changes.insert(identity.clone(), EntryChange::Removed);
        }
    }
    DirtyDiff { changes }
}

/// Diff two entry lists by identity field.
pub fn diff_lists(current: &[Value], original: &[Value], identity_field: &str) -> DirtyDiff {
    diff_maps(
        &diffable_map(current, identity_field),
        &diffable_map(original, identity_field),
    )
}

/// Number of changed entries between two lists.
pub fn unsaved_count(current: &[Value], original: &[Value], identity_field: &str) -> usize {
    diff_lists(current, original, identity_field).count()
}

/// Collect dotted paths of differing leaves. Objects are walked; arrays and
/// scalars are leaves.
fn changed_leaves(current: &Value, original: &Value, prefix: &str, out: &mut Vec<String>) {
    match (current, original) {
        (Value::Object(a), Value::Object(b)) => {
            for key in union_keys(a, b) {
                let path = if prefix.is_empty() {
                    key.to_string()
                } else {
                    format!("{prefix}.{key}")
                };
                match (a.get(key), b.get(key)) {
                    (Some(x), Some(y)) => changed_leaves(x, y, &path, out),
                    _ => out.push(path),
                }
            }
        }
        _ if current != original => out.push(prefix.to_string()),
        _ => {}
    }
}

fn union_keys<'a>(a: &'a Map<String, Value>, b: &'a Map<String, Value>) -> Vec<&'a str> {
    let mut keys: Vec<&str> = a.keys().map(String::as_str).collect();
    for key in b.keys() {
        if !a.contains_key(key) {
            keys.push(key);
        }
    }
    keys
}
