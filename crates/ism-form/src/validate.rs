//! Validation engine.
//!
//! Rules of one field run in registration order and stop at the first
//! error. Fields are validated concurrently against one shared snapshot.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures_util::future::join_all;
use ism_model::FieldPath;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::FormError;
use crate::rule::{Rule, RuleContext, outcome_message};
use crate::store;

/// Result of a validation pass over every registered field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationOutcome {
    /// Invocation token of the pass; higher is newer.
    pub token: u64,
    /// First failing message per field path, `None` when every field passed.
    pub errors: Option<BTreeMap<String, String>>,
    /// The state the pass validated.
    pub values: Value,
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        self.errors.is_none()
    }

    /// The validated values, or `ValidationFailed` with the error map.
    pub fn into_result(self) -> Result<Value, FormError> {
        match self.errors {
            None => Ok(self.values),
            Some(errors) => Err(FormError::ValidationFailed { errors }),
        }
    }
}

/// Run one field's rules and return its first error message.
pub async fn validate_field(path: FieldPath, rules: &[Rule], values: Arc<Value>) -> Option<String> {
    let ctx = RuleContext::new(path, values);
    let value = store::get(ctx.values(), ctx.path()).cloned();
    for rule in rules {
        if let Some(message) = outcome_message(rule.evaluate(&ctx, value.as_ref()).await) {
            debug!(path = %ctx.path(), %message, "field rule failed");
            return Some(message);
        }
    }
    None
}

/// Validate every `(path, rules)` pair concurrently.
///
/// The returned map holds an entry for every field: `None` when it passed.
pub async fn validate_fields(
    fields: Vec<(FieldPath, Vec<Rule>)>,
    values: Arc<Value>,
) -> BTreeMap<FieldPath, Option<String>> {
    let checks = fields.into_iter().map(|(path, rules)| {
        let values = Arc::clone(&values);
        async move {
            let error = validate_field(path.clone(), &rules, values).await;
            (path, error)
        }
    });
    join_all(checks).await.into_iter().collect()
}

/// Reduce per-field results to the dotted-path error map.
pub fn collect_errors(results: &BTreeMap<FieldPath, Option<String>>) -> Option<BTreeMap<String, String>> {
    let errors: BTreeMap<String, String> = results
        .iter()
        .filter_map(|(path, error)| error.as_ref().map(|e| (path.dotted(), e.clone())))
        .collect();
    (!errors.is_empty()).then_some(errors)
}
