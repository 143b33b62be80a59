//! The toast capability.

use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use tracing::{info, warn};

/// A danger toast with an optional body text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Toast {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl Toast {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            text: None,
        }
    }

    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }
}

impl From<String> for Toast {
    fn from(title: String) -> Self {
        Self::new(title)
    }
}

impl From<&str> for Toast {
    fn from(title: &str) -> Self {
        Self::new(title)
    }
}

/// Shows notifications to the user.
pub trait Notifier: Send + Sync {
    fn add_success(&self, message: &str);
    fn add_danger(&self, toast: Toast);
}

impl<N: Notifier> Notifier for Arc<N> {
    fn add_success(&self, message: &str) {
        N::add_success(self, message);
    }

    fn add_danger(&self, toast: Toast) {
        N::add_danger(self, toast);
    }
}

/// Writes toasts to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn add_success(&self, message: &str) {
        info!(target: "ism::toast", "{message}");
    }

    fn add_danger(&self, toast: Toast) {
        match &toast.text {
            Some(text) => warn!(target: "ism::toast", %text, "{}", toast.title),
            None => warn!(target: "ism::toast", "{}", toast.title),
        }
    }
}

/// Kind of a recorded toast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastKind {
    Success,
    Danger,
}

/// Keeps every toast in memory, for front-ends that render them later.
#[derive(Debug, Default)]
pub struct ToastLog {
    toasts: Mutex<Vec<(ToastKind, Toast)>>,
}

impl ToastLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take all toasts recorded so far.
    pub fn drain(&self) -> Vec<(ToastKind, Toast)> {
        std::mem::take(&mut *self.toasts.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn push(&self, kind: ToastKind, toast: Toast) {
        self.toasts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((kind, toast));
    }
}

impl Notifier for ToastLog {
    fn add_success(&self, message: &str) {
        self.push(ToastKind::Success, Toast::new(message));
    }

    fn add_danger(&self, toast: Toast) {
        self.push(ToastKind::Danger, toast);
    }
}
