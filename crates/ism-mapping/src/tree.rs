//! Arena-backed mapping tree editor.
//!
//! Fields live in a flat slot vector; parents and children refer to each
//! other by [`NodeId`]. Ids stay valid for the lifetime of the tree; deleted
//! slots are tombstoned, never reused.
//!
//! Positional paths (`"2.properties.0"`: third top-level field, its first
//! child) are accepted at the edges and resolved to ids with
//! [`MappingTree::resolve`].

use std::fmt;

use ism_model::{
    DEFAULT_NEW_FIELD_TYPE, MappingObject, NEW_FIELD_PREFIX, allows_properties, effective_type,
    is_known_type, is_type_with_children, segment_index,
};
use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::error::{MappingError, Result};
use crate::node::{FIELD_NAME_KEY, MappingNode, PROPERTIES_KEY};
use crate::schema;
use crate::transform::object_to_nodes;

/// Joins levels of positional and name paths.
const PATH_SEPARATOR: &str = ".properties.";

/// Stable handle of a field in a [`MappingTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone)]
struct Slot {
    name: String,
    settings: Map<String, Value>,
    parent: Option<NodeId>,
    /// `None` when the field has no `properties` block.
    children: Option<Vec<NodeId>>,
    live: bool,
}

/// Editable mapping tree.
#[derive(Debug, Clone, Default)]
pub struct MappingTree {
    slots: Vec<Slot>,
    roots: Vec<NodeId>,
    /// Saved mapping in edit mode. Fields present here are locked.
    saved: Option<MappingObject>,
    placeholder_seq: u64,
}

impl MappingTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a tree from nodes in display order.
    pub fn from_nodes(nodes: &[MappingNode]) -> Self {
        let mut tree = Self::new();
        for node in nodes {
            tree.push_node(node, None);
        }
        tree
    }

    /// Build a tree from a mapping object.
    pub fn from_object(object: &MappingObject) -> Result<Self> {
        Ok(Self::from_nodes(&object_to_nodes(object)?))
    }

    /// Switch to edit mode: fields of `saved` can no longer be renamed,
    /// retyped or deleted. New sub-fields may still be added under them.
    #[must_use]
    pub fn with_saved_mapping(mut self, saved: MappingObject) -> Self {
        self.saved = Some(saved);
        self
    }

    pub fn saved_mapping(&self) -> Option<&MappingObject> {
        self.saved.as_ref()
    }

    pub fn is_edit_mode(&self) -> bool {
        self.saved.is_some()
    }

    /// Number of live fields at any depth.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.live).count()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn children(&self, id: NodeId) -> Result<&[NodeId]> {
        Ok(self.slot(id)?.children.as_deref().unwrap_or(&[]))
    }

    pub fn parent(&self, id: NodeId) -> Result<Option<NodeId>> {
        Ok(self.slot(id)?.parent)
    }

    pub fn name(&self, id: NodeId) -> Result<&str> {
        Ok(&self.slot(id)?.name)
    }

    pub fn settings(&self, id: NodeId) -> Result<&Map<String, Value>> {
        Ok(&self.slot(id)?.settings)
    }

    /// Effective type; fields without `type` are objects.
    pub fn field_type(&self, id: NodeId) -> Result<&str> {
        Ok(effective_type(&self.slot(id)?.settings))
    }

    /// Find a field by its names from the root.
    pub fn find(&self, names: &[&str]) -> Option<NodeId> {
        let mut level: &[NodeId] = &self.roots;
        let mut found = None;
        for name in names {
            let id = *level.iter().find(|id| self.slots[id.0].name == *name)?;
            level = self.slots[id.0].children.as_deref().unwrap_or(&[]);
            found = Some(id);
        }
        found
    }

    /// Tree form in display order.
    pub fn to_nodes(&self) -> Vec<MappingNode> {
        self.roots.iter().map(|id| self.node_of(*id)).collect()
    }

    /// Subtree rooted at `id`.
    pub fn node(&self, id: NodeId) -> Result<MappingNode> {
        self.slot(id)?;
        Ok(self.node_of(id))
    }

    /// Object form. A later sibling reusing a name overwrites the earlier
    /// entry in place.
    pub fn to_object(&self) -> MappingObject {
        self.object_of(&self.roots)
    }

    /// Only the fields absent from the saved mapping, with their locked
    /// ancestors. Equals [`MappingTree::to_object`] outside edit mode.
    pub fn new_fields_object(&self) -> MappingObject {
        let mut object = Map::new();
        for id in &self.roots {
            if let Some((name, settings)) = self.new_entry(*id) {
                object.insert(name, settings);
            }
        }
        object
    }

    /// Check the current mapping against the mapping schema.
    pub fn validate(&self) -> Result<()> {
        schema::validate_mapping(&self.to_object())
    }

    /// Append a placeholder field (`NAME_YOUR_FIELD-<n>`, type `text`)
    /// under `parent`, or at the top level.
    pub fn add_field(&mut self, parent: Option<NodeId>) -> Result<NodeId> {
        let name = loop {
            self.placeholder_seq += 1;
            let candidate = format!("{NEW_FIELD_PREFIX}-{}", self.placeholder_seq);
            if !self.sibling_names(parent)?.any(|n| n == candidate) {
                break candidate;
            }
        };
        let mut settings = Map::new();
        settings.insert(
            "type".to_string(),
            Value::String(DEFAULT_NEW_FIELD_TYPE.to_string()),
        );
        self.add_named_field(parent, &name, settings)
    }

    /// Append a named field under `parent`, or at the top level.
    pub fn add_named_field(
        &mut self,
        parent: Option<NodeId>,
        name: &str,
        settings: Map<String, Value>,
    ) -> Result<NodeId> {
        if name.is_empty() {
            return Err(MappingError::FieldNameRequired);
        }
        for reserved in [FIELD_NAME_KEY, PROPERTIES_KEY] {
            if settings.contains_key(reserved) {
                return Err(MappingError::malformed(
                    name,
                    format!("settings may not contain '{reserved}'"),
                ));
            }
        }
        if let Some(parent) = parent {
            let parent_type = self.field_type(parent)?;
            if !allows_properties(parent_type) {
                return Err(MappingError::Schema {
                    path: self.name_path(parent)?,
                    message: format!("type '{parent_type}' cannot have sub fields"),
                });
            }
        }
        // Every existing sibling precedes the new field.
        if self.sibling_names(parent)?.any(|n| n == name) {
            return Err(self.duplicate(parent, name));
        }
        let id = self.insert_slot(parent, name.to_string(), settings);
        debug!(field = %self.name_path(id)?, "field added");
        Ok(id)
    }

    /// Remove a field and its sub-fields, returning the removed subtree.
    pub fn delete_field(&mut self, id: NodeId) -> Result<MappingNode> {
        self.ensure_unlocked(id)?;
        let removed = self.node_of(id);
        let path = self.name_path(id)?;
        let parent = self.slots[id.0].parent;
        self.siblings_mut(parent).retain(|sibling| *sibling != id);
        self.tombstone(id);
        debug!(field = %path, "field deleted");
        Ok(removed)
    }

    /// Rename a field in place.
    ///
    /// Only siblings before the field are checked for a collision.
    pub fn rename_field(&mut self, id: NodeId, new_name: &str) -> Result<()> {
        if new_name.is_empty() {
            return Err(MappingError::FieldNameRequired);
        }
        self.ensure_unlocked(id)?;
        let parent = self.slots[id.0].parent;
        let position = self.position(id)?;
        let collides = self.siblings(parent)[..position]
            .iter()
            .any(|sibling| self.slots[sibling.0].name == new_name);
        if collides {
            return Err(self.duplicate(parent, new_name));
        }
        trace!(from = %self.slots[id.0].name, to = new_name, "field renamed");
        self.slots[id.0].name = new_name.to_string();
        Ok(())
    }

    /// Set one settings key. `type` goes through [`MappingTree::set_type`].
    pub fn set_setting(&mut self, id: NodeId, key: &str, value: Value) -> Result<()> {
        if key == "type" {
            let Value::String(field_type) = value else {
                return Err(MappingError::Schema {
                    path: self.name_path(id)?,
                    message: "type must be a string".to_string(),
                });
            };
            return self.set_type(id, &field_type);
        }
        if key == FIELD_NAME_KEY || key == PROPERTIES_KEY {
            return Err(MappingError::malformed(
                self.name_path(id)?,
                format!("'{key}' is not a settings key"),
            ));
        }
        self.ensure_unlocked(id)?;
        self.slots[id.0].settings.insert(key.to_string(), value);
        Ok(())
    }

    pub fn remove_setting(&mut self, id: NodeId, key: &str) -> Result<Option<Value>> {
        self.ensure_unlocked(id)?;
        Ok(self.slots[id.0].settings.shift_remove(key))
    }

    /// Change a field's type. Choosing `object` drops the `type` key since
    /// objects are implicit.
    pub fn set_type(&mut self, id: NodeId, field_type: &str) -> Result<()> {
        self.ensure_unlocked(id)?;
        if !is_known_type(field_type) {
            return Err(MappingError::Schema {
                path: self.name_path(id)?,
                message: format!("unknown field type '{field_type}'"),
            });
        }
        if !allows_properties(field_type) && !self.children(id)?.is_empty() {
            return Err(MappingError::Schema {
                path: self.name_path(id)?,
                message: format!("type '{field_type}' cannot have sub fields"),
            });
        }
        let slot = &mut self.slots[id.0];
        if is_type_with_children(field_type) {
            slot.settings.shift_remove("type");
        } else {
            slot.settings
                .insert("type".to_string(), Value::String(field_type.to_string()));
        }
        Ok(())
    }

    /// Resolve a positional path such as `"2.properties.0"`.
    pub fn resolve(&self, positional: &str) -> Result<NodeId> {
        let invalid = |reason| MappingError::InvalidPositionalPath {
            path: positional.to_string(),
            reason,
        };
        let mut level: &[NodeId] = &self.roots;
        let mut current = None;
        for (i, segment) in positional.split('.').enumerate() {
            if i % 2 == 1 {
                if segment != PROPERTIES_KEY {
                    return Err(invalid("expected 'properties' between indices"));
                }
                continue;
            }
            let index = segment_index(segment).ok_or_else(|| invalid("expected an index"))?;
            let id = *level.get(index).ok_or_else(|| invalid("index out of range"))?;
            level = self.slots[id.0].children.as_deref().unwrap_or(&[]);
            current = Some(id);
        }
        if positional.split('.').count() % 2 == 0 {
            return Err(invalid("path ends with 'properties'"));
        }
        current.ok_or_else(|| invalid("path is empty"))
    }

    /// Positional path of a field, e.g. `"2.properties.0"`.
    pub fn positional_path(&self, id: NodeId) -> Result<String> {
        let mut parts = Vec::new();
        let mut current = Some(id);
        while let Some(node) = current {
            parts.push(self.position(node)?.to_string());
            current = self.slots[node.0].parent;
        }
        parts.reverse();
        Ok(parts.join(PATH_SEPARATOR))
    }

    /// Names from the root, e.g. `["user", "name"]`.
    pub fn names(&self, id: NodeId) -> Result<Vec<String>> {
        self.slot(id)?;
        let mut names = Vec::new();
        let mut current = Some(id);
        while let Some(node) = current {
            names.push(self.slots[node.0].name.clone());
            current = self.slots[node.0].parent;
        }
        names.reverse();
        Ok(names)
    }

    /// Object-form path of a field, e.g. `"user.properties.name"`.
    pub fn name_path(&self, id: NodeId) -> Result<String> {
        Ok(self.names(id)?.join(PATH_SEPARATOR))
    }

    /// Whether the field exists in the saved mapping.
    pub fn is_locked(&self, id: NodeId) -> Result<bool> {
        let Some(saved) = &self.saved else {
            self.slot(id)?;
            return Ok(false);
        };
        let names = self.names(id)?;
        Ok(lookup(saved, &names).is_some())
    }

    fn slot(&self, id: NodeId) -> Result<&Slot> {
        self.slots
            .get(id.0)
            .filter(|slot| slot.live)
            .ok_or(MappingError::UnknownNode(id.0))
    }

    fn ensure_unlocked(&self, id: NodeId) -> Result<()> {
        if self.is_locked(id)? {
            return Err(MappingError::FieldLocked {
                path: self.name_path(id)?,
            });
        }
        Ok(())
    }

    fn duplicate(&self, parent: Option<NodeId>, name: &str) -> MappingError {
        MappingError::DuplicateFieldName {
            name: name.to_string(),
            parent: parent
                .and_then(|p| self.name_path(p).ok())
                .unwrap_or_default(),
        }
    }

    fn siblings(&self, parent: Option<NodeId>) -> &[NodeId] {
        match parent {
            Some(p) => self.slots[p.0].children.as_deref().unwrap_or(&[]),
            None => &self.roots,
        }
    }

    fn siblings_mut(&mut self, parent: Option<NodeId>) -> &mut Vec<NodeId> {
        match parent {
            Some(p) => self.slots[p.0].children.get_or_insert_with(Vec::new),
            None => &mut self.roots,
        }
    }

    fn sibling_names(&self, parent: Option<NodeId>) -> Result<impl Iterator<Item = &str>> {
        if let Some(p) = parent {
            self.slot(p)?;
        }
        Ok(self
            .siblings(parent)
            .iter()
            .map(|id| self.slots[id.0].name.as_str()))
    }

    fn position(&self, id: NodeId) -> Result<usize> {
        let parent = self.slot(id)?.parent;
        self.siblings(parent)
            .iter()
            .position(|sibling| *sibling == id)
            .ok_or(MappingError::UnknownNode(id.0))
    }

    fn insert_slot(&mut self, parent: Option<NodeId>, name: String, settings: Map<String, Value>) -> NodeId {
        let id = NodeId(self.slots.len());
        self.slots.push(Slot {
            name,
            settings,
            parent,
            children: None,
            live: true,
        });
        self.siblings_mut(parent).push(id);
        id
    }

    fn push_node(&mut self, node: &MappingNode, parent: Option<NodeId>) -> NodeId {
        let settings = node
            .settings
            .iter()
            .filter(|(key, _)| key.as_str() != FIELD_NAME_KEY && key.as_str() != PROPERTIES_KEY)
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        let id = self.insert_slot(parent, node.field_name.clone(), settings);
        if let Some(children) = &node.properties {
            self.slots[id.0].children = Some(Vec::with_capacity(children.len()));
            for child in children {
                self.push_node(child, Some(id));
            }
        }
        id
    }

    fn tombstone(&mut self, id: NodeId) {
        let children = self.slots[id.0].children.take().unwrap_or_default();
        self.slots[id.0].live = false;
        for child in children {
            self.tombstone(child);
        }
    }

    fn node_of(&self, id: NodeId) -> MappingNode {
        let slot = &self.slots[id.0];
        MappingNode {
            field_name: slot.name.clone(),
            settings: slot.settings.clone(),
            properties: slot
                .children
                .as_ref()
                .map(|children| children.iter().map(|c| self.node_of(*c)).collect()),
        }
    }

    fn object_of(&self, ids: &[NodeId]) -> MappingObject {
        let mut object = Map::new();
        for id in ids {
            let slot = &self.slots[id.0];
            let mut settings = slot.settings.clone();
            if let Some(children) = &slot.children {
                settings.insert(
                    PROPERTIES_KEY.to_string(),
                    Value::Object(self.object_of(children)),
                );
            }
            object.insert(slot.name.clone(), Value::Object(settings));
        }
        object
    }

    fn new_entry(&self, id: NodeId) -> Option<(String, Value)> {
        let slot = &self.slots[id.0];
        let locked = self.is_locked(id).unwrap_or(false);
        if !locked {
            let node = self.object_of(&[id]);
            return node.into_iter().next();
        }
        let children = slot.children.as_deref().unwrap_or(&[]);
        let mut nested = Map::new();
        for child in children {
            if let Some((name, settings)) = self.new_entry(*child) {
                nested.insert(name, settings);
            }
        }
        if nested.is_empty() {
            return None;
        }
        let mut settings = slot.settings.clone();
        settings.insert(PROPERTIES_KEY.to_string(), Value::Object(nested));
        Some((slot.name.clone(), Value::Object(settings)))
    }
}

/// Settings of the field at `names` inside a mapping object.
fn lookup<'a>(object: &'a MappingObject, names: &[String]) -> Option<&'a Map<String, Value>> {
    let (first, rest) = names.split_first()?;
    let settings = object.get(first)?.as_object()?;
    if rest.is_empty() {
        return Some(settings);
    }
    let properties = settings.get(PROPERTIES_KEY)?.as_object()?;
    lookup(properties, rest)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn object(value: Value) -> MappingObject {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    fn sample() -> MappingTree {
        MappingTree::from_object(&object(json!({
            "title": { "type": "text" },
            "user": {
                "properties": {
                    "name": { "type": "keyword" },
                    "age": { "type": "integer" }
                }
            },
            "created": { "type": "date" }
        })))
        .unwrap()
    }

    #[test]
    fn resolves_positional_paths() {
        let tree = sample();
        let age = tree.resolve("1.properties.1").unwrap();
        assert_eq!(tree.name(age).unwrap(), "age");
        assert_eq!(tree.positional_path(age).unwrap(), "1.properties.1");
        assert_eq!(tree.name_path(age).unwrap(), "user.properties.age");
        assert_eq!(tree.find(&["user", "age"]), Some(age));
    }

    #[test]
    fn rejects_bad_positional_paths() {
        let tree = sample();
        for bad in ["", "x", "1.children.0", "1.properties", "7", "0.properties.0", "01"] {
            assert!(
                matches!(tree.resolve(bad), Err(MappingError::InvalidPositionalPath { .. })),
                "{bad}"
            );
        }
    }

    #[test]
    fn add_field_uses_placeholder_names() {
        let mut tree = sample();
        let user = tree.resolve("1").unwrap();
        let first = tree.add_field(Some(user)).unwrap();
        let second = tree.add_field(Some(user)).unwrap();
        assert_eq!(tree.name(first).unwrap(), "NAME_YOUR_FIELD-1");
        assert_eq!(tree.name(second).unwrap(), "NAME_YOUR_FIELD-2");
        assert_eq!(tree.field_type(first).unwrap(), "text");
        assert_eq!(tree.positional_path(second).unwrap(), "1.properties.3");
    }

    #[test]
    fn add_field_under_leaf_is_rejected() {
        let mut tree = sample();
        let title = tree.resolve("0").unwrap();
        assert!(matches!(
            tree.add_field(Some(title)),
            Err(MappingError::Schema { .. })
        ));
    }

    #[test]
    fn add_named_duplicate_is_rejected() {
        let mut tree = sample();
        let before = tree.to_nodes();
        let err = tree
            .add_named_field(None, "created", Map::new())
            .unwrap_err();
        assert!(matches!(err, MappingError::DuplicateFieldName { .. }));
        assert_eq!(tree.to_nodes(), before);
        assert_eq!(
            tree.add_named_field(None, "", Map::new()).unwrap_err(),
            MappingError::FieldNameRequired
        );
    }

    #[test]
    fn delete_preserves_sibling_order() {
        let mut tree = sample();
        let user = tree.resolve("1").unwrap();
        let removed = tree.delete_field(user).unwrap();
        assert_eq!(removed.properties.map(|p| p.len()), Some(2));
        let names: Vec<&str> = tree.roots().iter().map(|id| tree.name(*id).unwrap()).collect();
        assert_eq!(names, ["title", "created"]);
        assert_eq!(tree.len(), 2);
        assert_eq!(tree.name(user), Err(MappingError::UnknownNode(user.index())));
    }

    #[test]
    fn choosing_object_drops_type() {
        let mut tree = sample();
        let created = tree.resolve("2").unwrap();
        tree.set_type(created, "object").unwrap();
        assert!(!tree.settings(created).unwrap().contains_key("type"));
        assert_eq!(tree.field_type(created).unwrap(), "object");
        tree.set_setting(created, "type", json!("nested")).unwrap();
        assert_eq!(tree.settings(created).unwrap()["type"], json!("nested"));
    }

    #[test]
    fn retyping_parent_to_leaf_is_rejected() {
        let mut tree = sample();
        let user = tree.resolve("1").unwrap();
        assert!(matches!(
            tree.set_type(user, "keyword"),
            Err(MappingError::Schema { .. })
        ));
        assert!(matches!(
            tree.set_type(user, "varchar"),
            Err(MappingError::Schema { .. })
        ));
    }

    #[test]
    fn reserved_setting_keys_are_rejected() {
        let mut tree = sample();
        let title = tree.resolve("0").unwrap();
        assert!(matches!(
            tree.set_setting(title, "properties", json!({})),
            Err(MappingError::Malformed { .. })
        ));
        tree.set_setting(title, "analyzer", json!("standard")).unwrap();
        assert_eq!(
            tree.to_object()["title"],
            json!({ "type": "text", "analyzer": "standard" })
        );
    }

    #[test]
    fn edit_mode_locks_saved_fields() {
        let saved = sample().to_object();
        let mut tree = MappingTree::from_object(&saved).unwrap().with_saved_mapping(saved);
        let user = tree.resolve("1").unwrap();
        let name = tree.resolve("1.properties.0").unwrap();

        assert!(tree.is_locked(name).unwrap());
        assert!(matches!(
            tree.rename_field(name, "login"),
            Err(MappingError::FieldLocked { .. })
        ));
        assert!(matches!(tree.delete_field(user), Err(MappingError::FieldLocked { .. })));
        assert!(matches!(
            tree.set_type(name, "text"),
            Err(MappingError::FieldLocked { .. })
        ));

        let added = tree.add_field(Some(user)).unwrap();
        assert!(!tree.is_locked(added).unwrap());
        tree.rename_field(added, "email").unwrap();
        tree.set_type(added, "keyword").unwrap();

        assert_eq!(
            Value::Object(tree.new_fields_object()),
            json!({ "user": { "properties": { "email": { "type": "keyword" } } } })
        );
    }

    #[test]
    fn new_fields_object_outside_edit_mode_is_everything() {
        let tree = sample();
        assert_eq!(tree.new_fields_object(), tree.to_object());
    }
}
