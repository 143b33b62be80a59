//! Tree form of an index mapping.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Key carrying the field name in node form.
pub const FIELD_NAME_KEY: &str = "fieldName";

/// Key carrying nested fields in both forms.
pub const PROPERTIES_KEY: &str = "properties";

/// One field of a mapping in tree form.
///
/// Serialises as `{ "fieldName": .., ..settings, "properties": [..] }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingNode {
    #[serde(rename = "fieldName")]
    pub field_name: String,

    /// Every settings key of the field except `properties`.
    #[serde(flatten)]
    pub settings: Map<String, Value>,

    /// Nested fields in display order. `None` when the field has no
    /// `properties` block at all; `Some(vec![])` for an empty one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Vec<MappingNode>>,
}

impl MappingNode {
    /// Leaf field with the given settings.
    pub fn new(field_name: impl Into<String>, settings: Map<String, Value>) -> Self {
        Self {
            field_name: field_name.into(),
            settings,
            properties: None,
        }
    }

    /// Leaf field with only a `type` setting.
    pub fn typed(field_name: impl Into<String>, field_type: &str) -> Self {
        let mut settings = Map::new();
        settings.insert("type".to_string(), Value::String(field_type.to_string()));
        Self::new(field_name, settings)
    }

    #[must_use]
    pub fn with_properties(mut self, properties: Vec<MappingNode>) -> Self {
        self.properties = Some(properties);
        self
    }

    /// Effective field type; fields without `type` are objects.
    pub fn field_type(&self) -> &str {
        ism_model::effective_type(&self.settings)
    }
}
