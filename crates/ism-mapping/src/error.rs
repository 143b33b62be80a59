//! Mapping editor errors.

use thiserror::Error;

/// Message shown when the JSON editor content cannot be used.
pub const INVALID_JSON_MESSAGE: &str = "Your input does not match the validation of json format";

/// Errors from mapping transforms and tree edits.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MappingError {
    /// A rename or add collides with an earlier sibling.
    #[error("duplicate field name '{name}' under '{parent}'")]
    DuplicateFieldName { name: String, parent: String },

    /// `object -> nodes -> object` did not reproduce the input.
    #[error("mapping round trip mismatch: {detail}")]
    RoundTripMismatch { detail: String },

    /// The mapping object is not shaped like a mapping.
    #[error("malformed mapping at '{path}': {reason}")]
    Malformed { path: String, reason: String },

    #[error("field name is required")]
    FieldNameRequired,

    /// The field exists in the saved mapping and cannot be changed.
    #[error("field '{path}' exists in the saved mapping and cannot be modified")]
    FieldLocked { path: String },

    #[error("unknown node {0}")]
    UnknownNode(usize),

    #[error("invalid positional path '{path}': {reason}")]
    InvalidPositionalPath { path: String, reason: &'static str },

    /// JSON editor content did not parse as a mapping object.
    #[error("Your input does not match the validation of json format: {detail}")]
    InvalidJson { detail: String },

    /// The mapping parsed but violates the mapping schema.
    #[error("Your input does not match the validation of json format: '{path}' {message}")]
    Schema { path: String, message: String },
}

impl MappingError {
    pub(crate) fn malformed(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Malformed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Get a user-friendly message for this error.
    pub fn user_message(&self) -> String {
        match self {
            Self::DuplicateFieldName { name, .. } => {
                format!("Duplicate field name {name}, please change your field name")
            }
            Self::FieldNameRequired => "Field name is required, please input".to_string(),
            Self::FieldLocked { path } => {
                format!("Field {path} already exists in the index and cannot be changed")
            }
            Self::InvalidJson { .. } | Self::Schema { .. } | Self::Malformed { .. } => {
                INVALID_JSON_MESSAGE.to_string()
            }
            Self::RoundTripMismatch { .. }
            | Self::UnknownNode(_)
            | Self::InvalidPositionalPath { .. } => format!("Internal error: {self}"),
        }
    }

    /// True for errors caused by user input rather than a programming error.
    pub fn is_user_error(&self) -> bool {
        !matches!(
            self,
            Self::RoundTripMismatch { .. } | Self::UnknownNode(_) | Self::InvalidPositionalPath { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, MappingError>;
