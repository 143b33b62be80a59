//! Shared model types for the index management crates.

pub mod error;
pub mod mapping;
pub mod notification;
pub mod path;
pub mod response;

pub use error::{ModelError, Result};
pub use mapping::{
    DEFAULT_NEW_FIELD_TYPE, IMPLICIT_FIELD_TYPE, INDEX_MAPPING_TYPES,
    INDEX_MAPPING_TYPES_WITH_CHILDREN, MappingObject, NEW_FIELD_PREFIX, allows_properties,
    effective_type, is_known_type, is_type_with_children,
};
pub use notification::{
    LronChannel, LronCondition, LronConfig, LronConfigEntry, LronConfigListResponse,
    PlainLronConfig, action_title, config_list_to_plain_list,
};
pub use path::{FieldPath, segment_index};
pub use response::{ApiRequest, HttpMethod, ServerResponse};
