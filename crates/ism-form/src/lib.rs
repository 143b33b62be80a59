//! Form state for index management screens.
//!
//! - [`store`]: read and write nested JSON by [`FieldPath`](ism_model::FieldPath)
//! - [`registry`]: registered fields with rules and cached errors
//! - [`rule`] and [`validate`]: the validation engine
//! - [`diff`] and [`tracker`]: unsaved-change detection for the save bar

pub mod diff;
pub mod error;
pub mod registry;
pub mod rule;
pub mod store;
pub mod tracker;
pub mod validate;

pub use diff::{DirtyDiff, EntryChange, diff_lists, diff_maps, diffable_map, unsaved_count};
pub use error::{FormError, Result};
pub use registry::{FieldHandle, FieldRegistry};
pub use rule::{Rule, RuleContext, RuleFuture, RuleOutcome, Validator, is_empty_value};
pub use tracker::SubmitTracker;
pub use validate::ValidationOutcome;
