//! Index mapping editing.
//!
//! A mapping has two forms: the object form sent to the engine
//! (`{ name: { type, properties: { .. } } }`) and an ordered tree form used
//! for editing. [`transform`] converts between them, [`tree`] edits the tree
//! through stable node ids, [`schema`] checks JSON input and [`editor`]
//! switches between visual and JSON editing.

pub mod editor;
pub mod error;
pub mod node;
pub mod schema;
pub mod transform;
pub mod tree;

pub use editor::{EditorMode, MappingEditor, parse_mapping, render};
pub use error::{INVALID_JSON_MESSAGE, MappingError, Result};
pub use node::{FIELD_NAME_KEY, MappingNode, PROPERTIES_KEY};
pub use schema::{SchemaIssue, schema_issues, validate_mapping};
pub use transform::{nodes_to_object, object_to_nodes, verify_round_trip};
pub use tree::{MappingTree, NodeId};
