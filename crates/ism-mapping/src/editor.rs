//! Switchable mapping editor: a visual tree or raw JSON text.

use std::fmt;
use std::str::FromStr;

use ism_model::MappingObject;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{MappingError, Result};
use crate::schema::validate_mapping;
use crate::transform::verify_round_trip;
use crate::tree::MappingTree;

/// Which representation the editor currently shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditorMode {
    #[default]
    Visual,
    Json,
}

impl EditorMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Visual => "visual",
            Self::Json => "json",
        }
    }
}

impl fmt::Display for EditorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EditorMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "visual" => Ok(Self::Visual),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown editor mode '{other}'")),
        }
    }
}

/// Mapping editor holding a tree and, in JSON mode, the text being edited.
#[derive(Debug, Clone, Default)]
pub struct MappingEditor {
    mode: EditorMode,
    tree: MappingTree,
    json_text: String,
}

impl MappingEditor {
    /// Visual editor over `tree`.
    pub fn new(tree: MappingTree) -> Self {
        Self {
            mode: EditorMode::Visual,
            tree,
            json_text: String::new(),
        }
    }

    /// Editor for a new index.
    pub fn for_object(object: &MappingObject) -> Result<Self> {
        Ok(Self::new(MappingTree::from_object(object)?))
    }

    /// Editor for an existing index; fields of `saved` are locked.
    pub fn for_existing(saved: MappingObject) -> Result<Self> {
        let tree = MappingTree::from_object(&saved)?.with_saved_mapping(saved);
        Ok(Self::new(tree))
    }

    pub fn mode(&self) -> EditorMode {
        self.mode
    }

    pub fn tree(&self) -> &MappingTree {
        &self.tree
    }

    /// Tree for visual edits. Edits made in JSON mode are discarded by the
    /// next switch back to visual, so callers should check [`Self::mode`].
    pub fn tree_mut(&mut self) -> &mut MappingTree {
        &mut self.tree
    }

    /// JSON text; empty in visual mode.
    pub fn json_text(&self) -> &str {
        &self.json_text
    }

    /// Replace the JSON text. The text is only checked on the next switch
    /// or [`Self::value`].
    pub fn set_json_text(&mut self, text: impl Into<String>) {
        self.json_text = text.into();
    }

    /// Switch modes.
    ///
    /// Leaving JSON mode parses, schema-checks and round-trip-verifies the
    /// text; on failure the editor stays in JSON mode.
    pub fn switch_to(&mut self, mode: EditorMode) -> Result<()> {
        match (self.mode, mode) {
            (EditorMode::Visual, EditorMode::Json) => {
                self.json_text = render(&self.tree.to_object())?;
            }
            (EditorMode::Json, EditorMode::Visual) => {
                let object = parse_mapping(&self.json_text)?;
                self.tree = self.rebuild(&object)?;
                self.json_text.clear();
            }
            _ => return Ok(()),
        }
        debug!(from = %self.mode, to = %mode, "editor mode switched");
        self.mode = mode;
        Ok(())
    }

    /// Current mapping in object form.
    pub fn value(&self) -> Result<MappingObject> {
        match self.mode {
            EditorMode::Visual => Ok(self.tree.to_object()),
            EditorMode::Json => parse_mapping(&self.json_text),
        }
    }

    /// Fields to send to the engine: everything for a new index, only the
    /// added fields in edit mode.
    pub fn new_fields(&self) -> Result<MappingObject> {
        match self.mode {
            EditorMode::Visual => Ok(self.tree.new_fields_object()),
            EditorMode::Json => {
                let object = parse_mapping(&self.json_text)?;
                Ok(self.rebuild(&object)?.new_fields_object())
            }
        }
    }

    fn rebuild(&self, object: &MappingObject) -> Result<MappingTree> {
        let tree = MappingTree::from_object(object)?;
        let tree = match self.tree.saved_mapping() {
            Some(saved) => {
                let tree = tree.with_saved_mapping(saved.clone());
                ensure_saved_fields_kept(saved, object)?;
                tree
            }
            None => tree,
        };
        Ok(tree)
    }
}

/// Pretty JSON text of a mapping object.
pub fn render(object: &MappingObject) -> Result<String> {
    serde_json::to_string_pretty(object).map_err(|err| MappingError::InvalidJson {
        detail: err.to_string(),
    })
}

/// Parse, schema-check and round-trip-verify JSON editor text.
pub fn parse_mapping(text: &str) -> Result<MappingObject> {
    let value: Value = serde_json::from_str(text).map_err(|err| {
        warn!(error = %err, "mapping JSON does not parse");
        MappingError::InvalidJson {
            detail: err.to_string(),
        }
    })?;
    let Value::Object(object) = value else {
        return Err(MappingError::InvalidJson {
            detail: "expected a JSON object".to_string(),
        });
    };
    validate_mapping(&object)?;
    verify_round_trip(&object)?;
    Ok(object)
}

/// In edit mode JSON text may not drop or change saved fields.
fn ensure_saved_fields_kept(saved: &MappingObject, edited: &MappingObject) -> Result<()> {
    ensure_level(saved, edited, "")
}

fn ensure_level(saved: &MappingObject, edited: &MappingObject, prefix: &str) -> Result<()> {
    for (name, saved_settings) in saved {
        let path = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{prefix}.properties.{name}")
        };
        let Some(edited_settings) = edited.get(name) else {
            return Err(MappingError::FieldLocked { path });
        };
        let (Some(saved_settings), Some(edited_settings)) =
            (saved_settings.as_object(), edited_settings.as_object())
        else {
            return Err(MappingError::FieldLocked { path });
        };
        let without_properties = |settings: &MappingObject| -> MappingObject {
            settings
                .iter()
                .filter(|(key, _)| key.as_str() != "properties")
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect()
        };
        if without_properties(saved_settings) != without_properties(edited_settings) {
            return Err(MappingError::FieldLocked { path });
        }
        if let Some(Value::Object(saved_children)) = saved_settings.get("properties") {
            let empty = MappingObject::new();
            let edited_children = edited_settings
                .get("properties")
                .and_then(Value::as_object)
                .unwrap_or(&empty);
            ensure_level(saved_children, edited_children, &path)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::error::INVALID_JSON_MESSAGE;

    fn object(value: Value) -> MappingObject {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn visual_to_json_renders_pretty_text() {
        let mut editor =
            MappingEditor::for_object(&object(json!({ "title": { "type": "text" } }))).unwrap();
        editor.switch_to(EditorMode::Json).unwrap();
        assert_eq!(editor.mode(), EditorMode::Json);
        assert_eq!(
            editor.json_text(),
            "{\n  \"title\": {\n    \"type\": \"text\"\n  }\n}"
        );
    }

    #[test]
    fn json_to_visual_rebuilds_tree() {
        let mut editor = MappingEditor::default();
        editor.switch_to(EditorMode::Json).unwrap();
        editor.set_json_text(r#"{ "b": { "type": "keyword" }, "a": { "properties": {} } }"#);
        editor.switch_to(EditorMode::Visual).unwrap();
        let names: Vec<&str> = editor
            .tree()
            .roots()
            .iter()
            .map(|id| editor.tree().name(*id).unwrap())
            .collect();
        assert_eq!(names, ["b", "a"]);
        assert_eq!(editor.json_text(), "");
    }

    #[test]
    fn invalid_json_keeps_json_mode() {
        let mut editor = MappingEditor::default();
        editor.switch_to(EditorMode::Json).unwrap();
        for text in ["{ not json", "[1, 2]", r#"{ "a": { "type": "varchar" } }"#] {
            editor.set_json_text(text);
            let err = editor.switch_to(EditorMode::Visual).unwrap_err();
            assert_eq!(err.user_message(), INVALID_JSON_MESSAGE);
            assert_eq!(editor.mode(), EditorMode::Json);
        }
    }

    #[test]
    fn json_edits_cannot_touch_saved_fields() {
        let saved = object(json!({ "title": { "type": "text" } }));
        let mut editor = MappingEditor::for_existing(saved).unwrap();
        editor.switch_to(EditorMode::Json).unwrap();

        editor.set_json_text(r#"{ "title": { "type": "keyword" } }"#);
        assert!(matches!(
            editor.switch_to(EditorMode::Visual),
            Err(MappingError::FieldLocked { .. })
        ));

        editor.set_json_text(r#"{ "title": { "type": "text" }, "body": { "type": "text" } }"#);
        assert_eq!(
            Value::Object(editor.new_fields().unwrap()),
            json!({ "body": { "type": "text" } })
        );
        editor.switch_to(EditorMode::Visual).unwrap();
        assert!(editor.tree().is_edit_mode());
    }

    #[test]
    fn mode_parses_case_insensitively() {
        assert_eq!("JSON".parse::<EditorMode>(), Ok(EditorMode::Json));
        assert_eq!("visual".parse::<EditorMode>(), Ok(EditorMode::Visual));
        assert!("tree".parse::<EditorMode>().is_err());
    }
}
