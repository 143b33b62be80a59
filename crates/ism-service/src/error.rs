//! Service error types.

use ism_form::FormError;
use ism_mapping::MappingError;
use ism_model::ModelError;
use thiserror::Error;

/// Errors from API calls and page controllers.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ServiceError {
    /// The proxy answered with `ok: false`.
    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status of the engine error body, when present.
        status: Option<u64>,
    },

    /// The request never produced a proxy envelope.
    #[error("network error: {0}")]
    Network(String),

    /// The engine rejected the call with a security exception or 403.
    #[error("permission denied: {0}")]
    NoPermission(String),

    /// Form fields failed validation; nothing was sent.
    #[error(transparent)]
    Validation(#[from] FormError),

    /// The mapping editor content is unusable; nothing was sent.
    #[error(transparent)]
    Mapping(#[from] MappingError),

    /// A response or input could not be decoded.
    #[error("JSON parse error: {0}")]
    JsonParse(String),
}

impl ServiceError {
    /// Returns a user-friendly error message suitable for a toast.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Api { message, .. } => message.clone(),
            Self::Network(_) => {
                "Could not reach OpenSearch Dashboards. Please check the server URL.".to_string()
            }
            Self::NoPermission(_) => "Contact your administrator to request permissions.".to_string(),
            Self::Validation(err) => err.user_message(),
            Self::Mapping(err) => err.user_message(),
            Self::JsonParse(_) => "An unexpected response was received.".to_string(),
        }
    }

    /// Returns whether retrying the same call may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

impl From<ModelError> for ServiceError {
    fn from(err: ModelError) -> Self {
        Self::Validation(FormError::from(err))
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        Self::JsonParse(err.to_string())
    }
}

/// Result type alias for service operations.
pub type Result<T> = std::result::Result<T, ServiceError>;
