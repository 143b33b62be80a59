//! Offline mapping and diff operations behind the CLI commands.

use std::collections::BTreeMap;

use anyhow::{Context, Result, bail};
use ism_form::{DirtyDiff, diff_lists, diff_maps};
use ism_mapping::{
    EditorMode, MappingEditor, MappingNode, MappingTree, NodeId, SchemaIssue, nodes_to_object,
    object_to_nodes, parse_mapping, schema_issues,
};
use ism_model::MappingObject;
use serde_json::Value;

/// One row of the field listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRow {
    /// Dotted name path, for example `user.name`.
    pub path: String,
    pub field_type: String,
    /// Present in the saved mapping and therefore not editable.
    pub locked: bool,
}

/// Result of checking a mapping.
#[derive(Debug, Clone, Default)]
pub struct MappingReport {
    pub fields: Vec<FieldRow>,
    pub issues: Vec<SchemaIssue>,
}

impl MappingReport {
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Parse a JSON object of any kind.
pub fn parse_object(text: &str) -> Result<MappingObject> {
    match serde_json::from_str::<Value>(text).context("invalid JSON")? {
        Value::Object(object) => Ok(object),
        other => bail!("expected a JSON object, found {}", kind(&other)),
    }
}

/// Mapping object text to its node list.
pub fn mapping_to_nodes(text: &str) -> Result<Vec<MappingNode>> {
    let object = parse_mapping(text)?;
    Ok(object_to_nodes(&object)?)
}

/// Node list text to its mapping object.
pub fn nodes_to_mapping(text: &str) -> Result<MappingObject> {
    let nodes: Vec<MappingNode> =
        serde_json::from_str(text).context("expected a JSON list of mapping nodes")?;
    Ok(nodes_to_object(&nodes)?)
}

/// Schema-check `text` and list its fields. With `saved`, fields of the
/// saved mapping are marked locked and must all still be present.
pub fn check_mapping(text: &str, saved: Option<MappingObject>) -> Result<MappingReport> {
    let object = parse_object(text)?;
    let issues = schema_issues(&object);
    if !issues.is_empty() {
        return Ok(MappingReport {
            fields: Vec::new(),
            issues,
        });
    }

    let tree = match saved {
        Some(saved) => {
            let mut editor = MappingEditor::for_existing(saved)?;
            editor.switch_to(EditorMode::Json)?;
            editor.set_json_text(text);
            editor.switch_to(EditorMode::Visual)?;
            editor.tree().clone()
        }
        None => MappingTree::from_object(&object)?,
    };
    let mut fields = Vec::new();
    for id in tree.roots() {
        collect_fields(&tree, *id, &mut fields)?;
    }
    Ok(MappingReport {
        fields,
        issues: Vec::new(),
    })
}

fn collect_fields(tree: &MappingTree, id: NodeId, out: &mut Vec<FieldRow>) -> Result<()> {
    out.push(FieldRow {
        path: tree.names(id)?.join("."),
        field_type: tree.field_type(id)?.to_string(),
        locked: tree.is_locked(id)?,
    });
    for child in tree.children(id)? {
        collect_fields(tree, *child, out)?;
    }
    Ok(())
}

/// Diff two configurations: lists are keyed by `identity_field`, objects by
/// their own keys.
pub fn diff_documents(
    current: &Value,
    original: &Value,
    identity_field: &str,
) -> Result<DirtyDiff> {
    match (current, original) {
        (Value::Array(current), Value::Array(original)) => {
            Ok(diff_lists(current, original, identity_field))
        }
        (Value::Object(current), Value::Object(original)) => {
            Ok(diff_maps(&to_btree(current), &to_btree(original)))
        }
        (current, original) => {
            bail!("cannot compare {} with {}", kind(current), kind(original))
        }
    }
}

fn to_btree(object: &MappingObject) -> BTreeMap<String, Value> {
    object
        .iter()
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
