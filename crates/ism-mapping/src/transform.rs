//! Conversion between the object and tree forms of a mapping.
//!
//! `object_to_nodes` walks entries in insertion order and lifts `properties`
//! into child nodes; `nodes_to_object` does the reverse. Composing the two
//! in either order is the identity for well-formed input.

use ism_model::MappingObject;
use serde_json::{Map, Value};
use tracing::{error, warn};

use crate::error::{MappingError, Result};
use crate::node::{FIELD_NAME_KEY, MappingNode, PROPERTIES_KEY};

/// Object form to tree form.
pub fn object_to_nodes(object: &MappingObject) -> Result<Vec<MappingNode>> {
    nodes_at(object, "")
}

fn nodes_at(object: &MappingObject, prefix: &str) -> Result<Vec<MappingNode>> {
    object
        .iter()
        .map(|(name, settings)| {
            let path = join(prefix, name);
            let Value::Object(settings) = settings else {
                return Err(MappingError::malformed(path, "field settings must be an object"));
            };
            if settings.contains_key(FIELD_NAME_KEY) {
                return Err(MappingError::malformed(path, "settings may not contain 'fieldName'"));
            }
            let properties = match settings.get(PROPERTIES_KEY) {
                None => None,
                Some(Value::Object(children)) => {
                    Some(nodes_at(children, &format!("{path}.{PROPERTIES_KEY}"))?)
                }
                Some(_) => {
                    return Err(MappingError::malformed(path, "'properties' must be an object"));
                }
            };
            let settings: Map<String, Value> = settings
                .iter()
                .filter(|(key, _)| key.as_str() != PROPERTIES_KEY)
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect();
            Ok(MappingNode {
                field_name: name.clone(),
                settings,
                properties,
            })
        })
        .collect()
}

/// Tree form to object form.
///
/// A later sibling with an already used name overwrites the earlier entry's
/// settings in place.
pub fn nodes_to_object(nodes: &[MappingNode]) -> Result<MappingObject> {
    object_at(nodes, "")
}

fn object_at(nodes: &[MappingNode], prefix: &str) -> Result<MappingObject> {
    let mut object = Map::new();
    for node in nodes {
        let path = join(prefix, &node.field_name);
        for reserved in [FIELD_NAME_KEY, PROPERTIES_KEY] {
            if node.settings.contains_key(reserved) {
                return Err(MappingError::malformed(
                    path,
                    format!("node settings may not contain '{reserved}'"),
                ));
            }
        }
        let mut settings = node.settings.clone();
        if let Some(children) = &node.properties {
            let nested = object_at(children, &format!("{path}.{PROPERTIES_KEY}"))?;
            settings.insert(PROPERTIES_KEY.to_string(), Value::Object(nested));
        }
        if object
            .insert(node.field_name.clone(), Value::Object(settings))
            .is_some()
        {
            warn!(%path, "duplicate sibling name, later field wins");
        }
    }
    Ok(object)
}

/// Convert to tree form and check that converting back reproduces `object`.
pub fn verify_round_trip(object: &MappingObject) -> Result<Vec<MappingNode>> {
    let nodes = object_to_nodes(object)?;
    let back = nodes_to_object(&nodes)?;
    if back != *object {
        let detail = first_difference(object, &back, "")
            .unwrap_or_else(|| "objects differ".to_string());
        error!(%detail, "mapping round trip mismatch");
        return Err(MappingError::RoundTripMismatch { detail });
    }
    Ok(nodes)
}

fn first_difference(expected: &MappingObject, actual: &MappingObject, prefix: &str) -> Option<String> {
    for (key, value) in expected {
        let path = join(prefix, key);
        match (value, actual.get(key)) {
            (_, None) => return Some(format!("'{path}' missing after round trip")),
            (Value::Object(a), Some(Value::Object(b))) => {
                if let Some(found) = first_difference(a, b, &path) {
                    return Some(found);
                }
            }
            (a, Some(b)) if a != b => return Some(format!("'{path}' changed")),
            _ => {}
        }
    }
    actual
        .keys()
        .find(|key| !expected.contains_key(*key))
        .map(|key| format!("'{}' added by round trip", join(prefix, key)))
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}
