//! Field validation rules.
//!
//! Rules are a tagged variant: the common checks are built in and anything
//! else is a [`Validator`] closure returning a future.
//!
//! A rule outcome is `Result<String, String>`: `Ok(message)` with a
//! non-empty message is an error, `Err(reason)` is an error carrying the
//! rejection reason. An empty message on either side means success.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, ready};
use ism_model::FieldPath;
use regex::Regex;
use serde_json::Value;

use crate::store;

/// Outcome of a single rule evaluation.
pub type RuleOutcome = Result<String, String>;

/// Future produced by a rule evaluation.
pub type RuleFuture = BoxFuture<'static, RuleOutcome>;

type ValidatorFn = dyn Fn(&RuleContext, Option<&Value>) -> RuleFuture + Send + Sync;

/// Read-only view of the form state handed to rules.
///
/// The state is a snapshot taken when the validation pass starts.
#[derive(Debug, Clone)]
pub struct RuleContext {
    path: FieldPath,
    values: Arc<Value>,
}

impl RuleContext {
    pub fn new(path: FieldPath, values: Arc<Value>) -> Self {
        Self { path, values }
    }

    /// Path of the field under validation.
    pub fn path(&self) -> &FieldPath {
        &self.path
    }

    /// Whole form state.
    pub fn values(&self) -> &Value {
        &self.values
    }

    /// Value anywhere in the form state.
    pub fn get(&self, path: &FieldPath) -> Option<&Value> {
        store::get(&self.values, path)
    }

    /// Value of a sibling of the field under validation.
    pub fn sibling(&self, name: &str) -> Option<&Value> {
        let sibling = match self.path.parent() {
            Some(parent) => parent.child(name).ok()?,
            None => FieldPath::parse(name).ok()?,
        };
        store::get(&self.values, &sibling)
    }
}

/// A custom asynchronous check.
#[derive(Clone)]
pub struct Validator(Arc<ValidatorFn>);

impl Validator {
    /// Wrap an async check. The closure receives borrowed inputs and must
    /// copy whatever its future needs.
    pub fn new<F, Fut>(check: F) -> Self
    where
        F: Fn(&RuleContext, Option<&Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = RuleOutcome> + Send + 'static,
    {
        let wrapped: Arc<ValidatorFn> =
            Arc::new(move |ctx: &RuleContext, value: Option<&Value>| check(ctx, value).boxed());
        Self(wrapped)
    }

    /// Wrap a synchronous check; `Err(message)` is a failure.
    pub fn sync<F>(check: F) -> Self
    where
        F: Fn(&RuleContext, Option<&Value>) -> Result<(), String> + Send + Sync + 'static,
    {
        let wrapped: Arc<ValidatorFn> =
            Arc::new(move |ctx: &RuleContext, value: Option<&Value>| {
                let outcome = match check(ctx, value) {
                    Ok(()) => Ok(String::new()),
                    Err(message) => Err(message),
                };
                ready(outcome).boxed()
            });
        Self(wrapped)
    }

    fn call(&self, ctx: &RuleContext, value: Option<&Value>) -> RuleFuture {
        (self.0)(ctx, value)
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Validator(..)")
    }
}

/// A validation rule attached to a field.
#[derive(Debug, Clone)]
pub enum Rule {
    /// Value must be present and non-empty.
    Required { message: String },
    /// Value must be present and non-empty when any of the given fields is
    /// exactly `true`.
    RequiredWhen {
        any_of: Vec<FieldPath>,
        message: String,
    },
    /// String value must match. Absent values pass; non-strings fail.
    Pattern { pattern: Regex, message: String },
    /// Integer value must lie in `min..=max`. Canonical decimal strings such
    /// as `"1"` count as integers, as the engine reports settings that way.
    /// Absent values pass; anything else fails.
    IntegerRange {
        min: i64,
        max: Option<i64>,
        message: String,
    },
    Custom(Validator),
}

impl Rule {
    pub fn required(message: impl Into<String>) -> Self {
        Self::Required {
            message: message.into(),
        }
    }

    pub fn required_when(any_of: Vec<FieldPath>, message: impl Into<String>) -> Self {
        Self::RequiredWhen {
            any_of,
            message: message.into(),
        }
    }

    pub fn pattern(pattern: Regex, message: impl Into<String>) -> Self {
        Self::Pattern {
            pattern,
            message: message.into(),
        }
    }

    pub fn integer_range(min: i64, max: Option<i64>, message: impl Into<String>) -> Self {
        Self::IntegerRange {
            min,
            max,
            message: message.into(),
        }
    }

    pub fn custom<F, Fut>(check: F) -> Self
    where
        F: Fn(&RuleContext, Option<&Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = RuleOutcome> + Send + 'static,
    {
        Self::Custom(Validator::new(check))
    }

    /// Evaluate the rule against `value`.
    pub fn evaluate(&self, ctx: &RuleContext, value: Option<&Value>) -> RuleFuture {
        let outcome = match self {
            Self::Required { message } => fail_if(is_empty_value(value), message),
            Self::RequiredWhen { any_of, message } => {
                let active = any_of
                    .iter()
                    .any(|path| ctx.get(path) == Some(&Value::Bool(true)));
                fail_if(active && is_empty_value(value), message)
            }
            Self::Pattern { pattern, message } => match value {
                None | Some(Value::Null) => Ok(String::new()),
                Some(Value::String(text)) => fail_if(!pattern.is_match(text), message),
                Some(_) => Ok(message.clone()),
            },
            Self::IntegerRange { min, max, message } => match value {
                None | Some(Value::Null) => Ok(String::new()),
                Some(value) => {
                    let in_range = as_integer(value)
                        .is_some_and(|n| n >= *min && max.is_none_or(|max| n <= max));
                    fail_if(!in_range, message)
                }
            },
            Self::Custom(validator) => return validator.call(ctx, value),
        };
        ready(outcome).boxed()
    }
}

/// Integer held by a JSON number or a canonical decimal string.
fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => {
            let text = text.as_str();
            let digits = text.strip_prefix('-').unwrap_or(text);
            let canonical = !digits.is_empty()
                && digits.bytes().all(|b| b.is_ascii_digit())
                && (digits == "0" || !digits.starts_with('0'))
                && text != "-0";
            if canonical { text.parse().ok() } else { None }
        }
        _ => None,
    }
}

fn fail_if(condition: bool, message: &str) -> RuleOutcome {
    if condition {
        Ok(message.to_string())
    } else {
        Ok(String::new())
    }
}

/// Absent, `null`, empty string, empty array or empty object.
pub fn is_empty_value(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        Some(Value::Object(map)) => map.is_empty(),
        Some(_) => false,
    }
}

/// Error message carried by an outcome, if any.
pub fn outcome_message(outcome: RuleOutcome) -> Option<String> {
    let message = match outcome {
        Ok(message) | Err(message) => message,
    };
    (!message.is_empty()).then_some(message)
}
