//! Index mapping catalogue.
//!
//! Field types offered by the mapping editor and the rules for which of them
//! may carry nested `properties`.

use serde_json::{Map, Value};

/// Nested, key-indexed mapping representation as sent to the engine.
pub type MappingObject = Map<String, Value>;

/// Prefix for placeholder names of freshly added fields.
pub const NEW_FIELD_PREFIX: &str = "NAME_YOUR_FIELD";

/// Type assigned to freshly added fields.
pub const DEFAULT_NEW_FIELD_TYPE: &str = "text";

/// Type assumed for a field whose settings carry no `type` key.
pub const IMPLICIT_FIELD_TYPE: &str = "object";

/// Field types selectable in the mapping editor.
pub const INDEX_MAPPING_TYPES: &[&str] = &[
    "alias",
    "binary",
    "boolean",
    "byte",
    "completion",
    "date",
    "date_nanos",
    "date_range",
    "double",
    "double_range",
    "flat_object",
    "float",
    "float_range",
    "geo_point",
    "geo_shape",
    "half_float",
    "integer",
    "integer_range",
    "ip",
    "ip_range",
    "join",
    "keyword",
    "knn_vector",
    "long",
    "long_range",
    "nested",
    "object",
    "percolator",
    "rank_feature",
    "rank_features",
    "scaled_float",
    "search_as_you_type",
    "short",
    "text",
    "token_count",
    "unsigned_long",
];

/// Types whose selection removes the explicit `type` key, because the
/// engine treats a field with `properties` and no type as an object.
pub const INDEX_MAPPING_TYPES_WITH_CHILDREN: &[&str] = &["object"];

/// Types that may carry a nested `properties` block.
pub const INDEX_MAPPING_TYPES_ALLOWING_PROPERTIES: &[&str] = &["object", "nested"];

pub fn is_known_type(field_type: &str) -> bool {
    INDEX_MAPPING_TYPES.contains(&field_type)
}

/// True when choosing `field_type` makes the field an implicit object.
pub fn is_type_with_children(field_type: &str) -> bool {
    INDEX_MAPPING_TYPES_WITH_CHILDREN.contains(&field_type)
}

/// True when a field of `field_type` may carry nested properties.
pub fn allows_properties(field_type: &str) -> bool {
    INDEX_MAPPING_TYPES_ALLOWING_PROPERTIES.contains(&field_type)
}

/// Effective type of a settings object: its `type` key, or `object`.
pub fn effective_type(settings: &Map<String, Value>) -> &str {
    settings
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or(IMPLICIT_FIELD_TYPE)
}
