//! API calls and page controllers for index management.
//!
//! Controllers talk to the dashboards proxy through an [`ApiCaller`] and
//! report outcomes through a [`Notifier`]; both are injected, so pages run
//! the same against [`HttpApiCaller`] and test doubles.

pub mod caller;
pub mod create_index;
pub mod error;
pub mod http;
pub mod notifications;
pub mod notifier;

pub use caller::{ApiCaller, decode};
pub use create_index::CreateIndexForm;
pub use error::{Result, ServiceError};
pub use http::{API_CALLER_PATH, DEFAULT_TIMEOUT, HttpApiCaller, endpoint_url};
pub use notifications::{LRON_PATH, NotificationSettings};
pub use notifier::{Notifier, Toast, ToastKind, ToastLog, TracingNotifier};
