use thiserror::Error;

/// Errors raised while constructing model values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// A field path could not be parsed.
    #[error("invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: &'static str },
}

impl ModelError {
    pub fn invalid_path(path: impl Into<String>, reason: &'static str) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason,
        }
    }
}

pub type Result<T> = std::result::Result<T, ModelError>;
