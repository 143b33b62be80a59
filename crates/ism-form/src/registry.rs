//! Field registry.
//!
//! The registry owns the live form state, the last saved snapshot and the
//! registered fields with their rules and cached errors. UI code holds
//! [`FieldHandle`]s bound to a path; every handle for the same path reads and
//! writes the same slot.
//!
//! All state sits behind one mutex so the registry can be shared with a
//! multi-threaded host; on a single UI thread the lock is uncontended.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use ism_model::FieldPath;
use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::error::Result;
use crate::rule::Rule;
use crate::store;
use crate::validate::{self, ValidationOutcome, collect_errors};

#[derive(Debug, Clone, Default)]
struct FieldEntry {
    rules: Vec<Rule>,
    error: Option<String>,
    /// Bumped whenever the field's value may have changed; a pass only
    /// writes back errors for fields whose generation it started with.
    generation: u64,
}

#[derive(Debug)]
struct RegistryState {
    values: Value,
    original: Value,
    fields: BTreeMap<FieldPath, FieldEntry>,
    /// Token of the most recently started validation pass.
    issued_token: u64,
    /// Token of the newest pass whose errors were written back.
    applied_token: u64,
}

impl RegistryState {
    fn clear_errors_touching(&mut self, path: &FieldPath) {
        for (field_path, entry) in &mut self.fields {
            if field_path == path
                || path.is_ancestor_of(field_path)
                || field_path.is_ancestor_of(path)
            {
                entry.error = None;
                entry.generation += 1;
            }
        }
    }

    fn clear_all_errors(&mut self) {
        for entry in self.fields.values_mut() {
            entry.error = None;
            entry.generation += 1;
        }
    }

    /// Store pass results for fields untouched since the pass started.
    fn apply(
        &mut self,
        results: BTreeMap<FieldPath, Option<String>>,
        started: &BTreeMap<FieldPath, u64>,
    ) {
        for (path, error) in results {
            let Some(entry) = self.fields.get_mut(&path) else {
                continue;
            };
            if started.get(&path) == Some(&entry.generation) {
                entry.error = error;
            } else {
                trace!(%path, "field edited during validation, result dropped");
            }
        }
    }
}

/// Registry of form fields over a shared JSON state.
///
/// Cloning the registry clones the handle, not the state.
#[derive(Debug, Clone)]
pub struct FieldRegistry {
    inner: Arc<Mutex<RegistryState>>,
}

impl Default for FieldRegistry {
    fn default() -> Self {
        Self::new(Value::Object(Map::new()))
    }
}

impl FieldRegistry {
    /// Create a registry seeded with `values`; the original snapshot starts
    /// as a copy of them.
    pub fn new(values: Value) -> Self {
        let original = values.clone();
        Self {
            inner: Arc::new(Mutex::new(RegistryState {
                values,
                original,
                fields: BTreeMap::new(),
                issued_token: 0,
                applied_token: 0,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a field, or re-bind an existing one.
    ///
    /// Re-registration keeps the value and cached error and replaces the
    /// rules.
    pub fn register_field(&self, path: FieldPath, rules: Vec<Rule>) -> FieldHandle {
        {
            let mut state = self.lock();
            match state.fields.get_mut(&path) {
                Some(entry) => entry.rules = rules,
                None => {
                    trace!(%path, "field registered");
                    state.fields.insert(
                        path.clone(),
                        FieldEntry {
                            rules,
                            error: None,
                            generation: 0,
                        },
                    );
                }
            }
        }
        FieldHandle {
            registry: self.clone(),
            path,
        }
    }

    /// Drop a field registration. The value stays in the state.
    pub fn unregister_field(&self, path: &FieldPath) -> bool {
        self.lock().fields.remove(path).is_some()
    }

    pub fn is_registered(&self, path: &FieldPath) -> bool {
        self.lock().fields.contains_key(path)
    }

    pub fn registered_paths(&self) -> Vec<FieldPath> {
        self.lock().fields.keys().cloned().collect()
    }

    pub fn get_value(&self, path: &FieldPath) -> Option<Value> {
        store::get(&self.lock().values, path).cloned()
    }

    /// Write a value and drop cached errors of every field sharing the path.
    ///
    /// An array index too far past the end is rejected without touching
    /// the state.
    pub fn set_value(&self, path: &FieldPath, value: Value) -> Result<()> {
        let mut state = self.lock();
        store::set(&mut state.values, path, value)?;
        state.clear_errors_touching(path);
        Ok(())
    }

    /// Remove a value from the state.
    pub fn unset_value(&self, path: &FieldPath) -> Option<Value> {
        let mut state = self.lock();
        let removed = store::unset(&mut state.values, path);
        state.clear_errors_touching(path);
        removed
    }

    pub fn get_error(&self, path: &FieldPath) -> Option<String> {
        self.lock()
            .fields
            .get(path)
            .and_then(|entry| entry.error.clone())
    }

    /// Set or clear a field error directly, e.g. from a server response.
    /// Unregistered paths are ignored.
    pub fn set_error(&self, path: &FieldPath, error: Option<String>) {
        if let Some(entry) = self.lock().fields.get_mut(path) {
            entry.error = error;
        }
    }

    /// Current errors keyed by dotted path.
    pub fn errors(&self) -> BTreeMap<String, String> {
        self.lock()
            .fields
            .iter()
            .filter_map(|(path, entry)| entry.error.clone().map(|e| (path.dotted(), e)))
            .collect()
    }

    /// Copy of the live state.
    pub fn get_values(&self) -> Value {
        self.lock().values.clone()
    }

    /// Replace the live state, clearing cached errors.
    pub fn reset_values(&self, values: Value) {
        let mut state = self.lock();
        state.values = values;
        state.clear_all_errors();
        debug!("form values reset");
    }

    pub fn get_original_values(&self) -> Value {
        self.lock().original.clone()
    }

    pub fn set_original_values(&self, values: Value) {
        self.lock().original = values;
    }

    /// Load server data: live state and original snapshot both become
    /// `values`.
    pub fn load(&self, values: Value) {
        let mut state = self.lock();
        state.original = values.clone();
        state.values = values;
        state.clear_all_errors();
    }

    /// Discard edits by restoring the original snapshot.
    pub fn cancel(&self) {
        let mut state = self.lock();
        state.values = state.original.clone();
        state.clear_all_errors();
        debug!("form edits discarded");
    }

    /// Whether the live state differs from the original snapshot.
    pub fn is_modified(&self) -> bool {
        let state = self.lock();
        state.values != state.original
    }

    /// Validate every registered field.
    ///
    /// Errors are written back to the fields unless a newer pass has
    /// already done so. Fields edited while the pass ran keep their cleared
    /// error. Callers with overlapping passes compare
    /// [`ValidationOutcome::token`] against [`FieldRegistry::is_latest`].
    pub async fn validate(&self) -> ValidationOutcome {
        let (token, snapshot, fields, started) = {
            let mut state = self.lock();
            state.issued_token += 1;
            let fields: Vec<(FieldPath, Vec<Rule>)> = state
                .fields
                .iter()
                .map(|(path, entry)| (path.clone(), entry.rules.clone()))
                .collect();
            let started: BTreeMap<FieldPath, u64> = state
                .fields
                .iter()
                .map(|(path, entry)| (path.clone(), entry.generation))
                .collect();
            (state.issued_token, Arc::new(state.values.clone()), fields, started)
        };

        let results = validate::validate_fields(fields, Arc::clone(&snapshot)).await;
        let errors = collect_errors(&results);

        {
            let mut state = self.lock();
            if token > state.applied_token {
                state.applied_token = token;
                state.apply(results, &started);
            } else {
                debug!(token, "stale validation pass not applied");
            }
        }

        debug!(
            token,
            failed = errors.as_ref().map_or(0, BTreeMap::len),
            "validation pass finished"
        );
        ValidationOutcome {
            token,
            errors,
            values: Arc::unwrap_or_clone(snapshot),
        }
    }

    /// Validate a single field (blur-time validation) and cache its error.
    pub async fn validate_field(&self, path: &FieldPath) -> Option<String> {
        let (issued, snapshot, entry) = {
            let state = self.lock();
            let entry = state.fields.get(path)?;
            let entry = (entry.rules.clone(), entry.generation);
            (state.issued_token, Arc::new(state.values.clone()), entry)
        };
        let (rules, generation) = entry;
        let error = validate::validate_field(path.clone(), &rules, snapshot).await;
        let mut state = self.lock();
        if state.issued_token == issued
            && let Some(entry) = state.fields.get_mut(path)
            && entry.generation == generation
        {
            entry.error = error.clone();
        }
        error
    }

    /// Whether `token` belongs to the most recently started pass.
    pub fn is_latest(&self, token: u64) -> bool {
        self.lock().issued_token == token
    }
}

/// A field bound to a registry slot.
#[derive(Debug, Clone)]
pub struct FieldHandle {
    registry: FieldRegistry,
    path: FieldPath,
}

impl FieldHandle {
    pub fn path(&self) -> &FieldPath {
        &self.path
    }

    pub fn value(&self) -> Option<Value> {
        self.registry.get_value(&self.path)
    }

    pub fn error(&self) -> Option<String> {
        self.registry.get_error(&self.path)
    }

    /// Write a new value for this field.
    pub fn on_change(&self, value: Value) -> Result<()> {
        self.registry.set_value(&self.path, value)
    }

    /// True when both handles address the same slot of the same registry.
    pub fn shares_slot_with(&self, other: &FieldHandle) -> bool {
        Arc::ptr_eq(&self.registry.inner, &other.registry.inner) && self.path == other.path
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn path(raw: &str) -> FieldPath {
        FieldPath::parse(raw).unwrap()
    }

    #[test]
    fn registration_is_idempotent() {
        let registry = FieldRegistry::default();
        let first = registry.register_field(path("index"), vec![]);
        let second = registry.register_field(path("index"), vec![Rule::required("x")]);

        assert!(first.shares_slot_with(&second));
        first.on_change(json!("logs")).unwrap();
        assert_eq!(second.value(), Some(json!("logs")));
        assert_eq!(registry.registered_paths().len(), 1);
    }

    #[test]
    fn set_value_merges_into_shared_structure() {
        let registry = FieldRegistry::default();
        registry.set_value(&path("settings.index.number_of_shards"), json!(1)).unwrap();
        registry.set_value(&path("settings.index.number_of_replicas"), json!(2)).unwrap();
        assert_eq!(
            registry.get_values(),
            json!({ "settings": { "index": { "number_of_shards": 1, "number_of_replicas": 2 } } })
        );
    }

    #[test]
    fn original_snapshot_is_independent() {
        let registry = FieldRegistry::default();
        registry.load(json!({ "name": "a" }));
        registry.set_value(&path("name"), json!("b")).unwrap();
        assert_eq!(registry.get_original_values(), json!({ "name": "a" }));
        assert!(registry.is_modified());

        registry.cancel();
        assert_eq!(registry.get_values(), json!({ "name": "a" }));
        assert!(!registry.is_modified());
    }

    #[tokio::test]
    async fn set_value_clears_cached_error() {
        let registry = FieldRegistry::default();
        let handle = registry.register_field(path("name"), vec![Rule::required("required")]);
        let outcome = registry.validate().await;
        assert!(!outcome.is_valid());
        assert_eq!(handle.error().as_deref(), Some("required"));

        handle.on_change(json!("x")).unwrap();
        assert_eq!(handle.error(), None);
    }

    #[tokio::test]
    async fn setting_a_parent_clears_child_errors() {
        let registry = FieldRegistry::default();
        let handle = registry.register_field(path("a.b"), vec![Rule::required("required")]);
        registry.validate().await;
        assert!(handle.error().is_some());
        registry.set_value(&path("a"), json!({ "b": 1 })).unwrap();
        assert!(handle.error().is_none());
    }

    #[tokio::test]
    async fn rules_are_replaced_on_reregistration() {
        let registry = FieldRegistry::default();
        registry.register_field(path("name"), vec![Rule::required("required")]);
        registry.register_field(path("name"), vec![]);
        assert!(registry.validate().await.is_valid());
    }

    #[tokio::test]
    async fn tokens_increase_per_pass() {
        let registry = FieldRegistry::default();
        let first = registry.validate().await;
        let second = registry.validate().await;
        assert!(second.token > first.token);
        assert!(!registry.is_latest(first.token));
        assert!(registry.is_latest(second.token));
    }

    #[tokio::test]
    async fn validate_field_caches_error() {
        let registry = FieldRegistry::default();
        registry.register_field(path("name"), vec![Rule::required("required")]);
        let error = registry.validate_field(&path("name")).await;
        assert_eq!(error.as_deref(), Some("required"));
        assert_eq!(registry.get_error(&path("name")).as_deref(), Some("required"));
        assert_eq!(registry.validate_field(&path("unknown")).await, None);
    }

    #[test]
    fn unregister_keeps_value() {
        let registry = FieldRegistry::new(json!({ "name": "x" }));
        registry.register_field(path("name"), vec![]);
        assert!(registry.unregister_field(&path("name")));
        assert!(!registry.is_registered(&path("name")));
        assert_eq!(registry.get_value(&path("name")), Some(json!("x")));
    }
}
