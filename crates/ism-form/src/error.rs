//! Form error types.

use std::collections::BTreeMap;

use ism_model::ModelError;
use thiserror::Error;

/// Errors surfaced by form operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    /// A path argument was malformed.
    #[error(transparent)]
    InvalidPath(#[from] ModelError),

    /// One or more fields failed validation.
    #[error("validation failed for {} field(s)", errors.len())]
    ValidationFailed {
        /// First failing message per dotted field path.
        errors: BTreeMap<String, String>,
    },
}

impl FormError {
    /// Get a user-friendly message for this error.
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidPath(err) => format!("Internal error: {err}"),
            Self::ValidationFailed { errors } => {
                if errors.len() == 1 {
                    "1 field needs your attention before saving.".to_string()
                } else {
                    format!("{} fields need your attention before saving.", errors.len())
                }
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, FormError>;
