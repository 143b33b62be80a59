//! Create / edit index form.
//!
//! Index name, shard and replica counts, aliases and advanced settings live
//! in a [`FieldRegistry`]; mappings live in a [`MappingEditor`]. Creating
//! sends `indices.create`; editing an existing index only sends the new
//! mapping fields through `indices.putMapping`.

use std::sync::LazyLock;

use ism_form::{FieldRegistry, Rule};
use ism_mapping::MappingEditor;
use ism_model::{ApiRequest, FieldPath, HttpMethod, MappingObject};
use regex::Regex;
use serde_json::{Map, Value, json};
use tracing::{debug, info};

use crate::caller::ApiCaller;
use crate::error::{Result, ServiceError};
use crate::notifier::{Notifier, Toast};

pub const INDEX_NAME_REQUIRED: &str = "Index name can not be null.";
pub const INDEX_NAME_INVALID: &str =
    "Index name must be lowercase and may not contain spaces or any of \\ / * ? \" < > | , # :";
pub const SHARDS_INVALID: &str = "Number of shards must be a positive integer.";
pub const REPLICAS_INVALID: &str = "Number of replicas must be a non-negative integer.";

/// Settings edited through dedicated fields rather than the advanced JSON.
const HIDDEN_SETTINGS: &[&str] = &["number_of_shards", "number_of_replicas"];

/// Lowercase, no forbidden characters, not starting with `_`, `-` or `+`.
static INDEX_NAME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^[^A-Z_\-+\\/*?"<>| ,#:][^A-Z\\/*?"<>| ,#:]*$"#)
        .expect("Invalid index name regex")
});

fn path(raw: &str) -> Result<FieldPath> {
    FieldPath::parse(raw).map_err(Into::into)
}

/// Form state of the create index page.
#[derive(Debug, Clone)]
pub struct CreateIndexForm {
    registry: FieldRegistry,
    editor: MappingEditor,
    /// Name of the index being edited; `None` when creating.
    existing: Option<String>,
}

impl CreateIndexForm {
    /// Empty form for a new index with one shard and one replica.
    pub fn new() -> Result<Self> {
        let values = json!({
            "index": "",
            "settings": { "index": { "number_of_shards": 1, "number_of_replicas": 1 } },
            "aliases": {},
        });
        Self::build(values, MappingEditor::default(), None)
    }

    /// Form for an existing index. Its saved mapping fields are locked.
    pub fn for_existing(index: &str, settings: Value, saved_mapping: MappingObject) -> Result<Self> {
        let mut values = Map::new();
        values.insert("index".to_string(), Value::String(index.to_string()));
        values.insert("settings".to_string(), settings);
        values.insert("aliases".to_string(), Value::Object(Map::new()));
        let values = Value::Object(values);
        let editor = MappingEditor::for_existing(saved_mapping)?;
        Self::build(values, editor, Some(index.to_string()))
    }

    fn build(values: Value, editor: MappingEditor, existing: Option<String>) -> Result<Self> {
        let registry = FieldRegistry::new(values);
        registry.register_field(
            path("index")?,
            vec![
                Rule::required(INDEX_NAME_REQUIRED),
                Rule::pattern(INDEX_NAME_REGEX.clone(), INDEX_NAME_INVALID),
            ],
        );
        registry.register_field(
            path("settings.index.number_of_shards")?,
            vec![Rule::integer_range(1, None, SHARDS_INVALID)],
        );
        registry.register_field(
            path("settings.index.number_of_replicas")?,
            vec![Rule::integer_range(0, None, REPLICAS_INVALID)],
        );
        Ok(Self {
            registry,
            editor,
            existing,
        })
    }

    pub fn registry(&self) -> &FieldRegistry {
        &self.registry
    }

    pub fn editor(&self) -> &MappingEditor {
        &self.editor
    }

    pub fn editor_mut(&mut self) -> &mut MappingEditor {
        &mut self.editor
    }

    pub fn is_edit(&self) -> bool {
        self.existing.is_some()
    }

    pub fn set_index_name(&self, name: &str) -> Result<()> {
        self.registry.set_value(&path("index")?, json!(name))?;
        Ok(())
    }

    pub fn set_shards(&self, shards: u64) -> Result<()> {
        self.registry
            .set_value(&path("settings.index.number_of_shards")?, json!(shards))?;
        Ok(())
    }

    pub fn set_replicas(&self, replicas: u64) -> Result<()> {
        self.registry
            .set_value(&path("settings.index.number_of_replicas")?, json!(replicas))?;
        Ok(())
    }

    /// Replace the aliases with `names`, each without options.
    pub fn set_aliases(&self, names: &[String]) -> Result<()> {
        let aliases: Map<String, Value> = names
            .iter()
            .filter(|name| !name.is_empty())
            .map(|name| (name.clone(), json!({})))
            .collect();
        self.registry.set_value(&path("aliases")?, Value::Object(aliases))?;
        Ok(())
    }

    /// Index settings other than shards and replicas, as shown in the
    /// advanced settings editor.
    pub fn advanced_settings(&self) -> Result<Map<String, Value>> {
        let settings = self
            .registry
            .get_value(&path("settings.index")?)
            .and_then(|v| v.as_object().cloned())
            .unwrap_or_default();
        Ok(settings
            .into_iter()
            .filter(|(key, _)| !HIDDEN_SETTINGS.contains(&key.as_str()))
            .collect())
    }

    /// Merge a JSON object of advanced settings into `settings.index`.
    pub fn merge_advanced_settings(&self, text: &str) -> Result<()> {
        let parsed: Value = serde_json::from_str(text)?;
        let Value::Object(parsed) = parsed else {
            return Err(ServiceError::JsonParse(
                "advanced settings must be a JSON object".to_string(),
            ));
        };
        let settings_path = path("settings.index")?;
        let mut settings = self
            .registry
            .get_value(&settings_path)
            .and_then(|v| v.as_object().cloned())
            .unwrap_or_default();
        settings.extend(parsed);
        self.registry.set_value(&settings_path, Value::Object(settings))?;
        Ok(())
    }

    /// Validate the form and the mapping, then build the engine calls.
    pub async fn build_requests(&self) -> Result<Vec<ApiRequest>> {
        let values = self.registry.validate().await.into_result()?;
        let mapping = self.editor.value()?;
        ism_mapping::validate_mapping(&mapping)?;

        let index = values.get("index").cloned().unwrap_or(Value::Null);
        if self.existing.is_some() {
            let new_fields = self.editor.new_fields()?;
            if new_fields.is_empty() {
                debug!("no new mapping fields to send");
                return Ok(Vec::new());
            }
            return Ok(vec![
                ApiRequest::new("indices.putMapping")
                    .with_method(HttpMethod::Put)
                    .with_data(json!({
                        "index": index,
                        "body": { "properties": new_fields },
                    })),
            ]);
        }

        let mut body = Map::new();
        if let Some(settings) = values.get("settings") {
            body.insert("settings".to_string(), settings.clone());
        }
        if !mapping.is_empty() {
            body.insert("mappings".to_string(), json!({ "properties": mapping }));
        }
        if let Some(aliases) = values
            .get("aliases")
            .filter(|a| a.as_object().is_some_and(|m| !m.is_empty()))
        {
            body.insert("aliases".to_string(), aliases.clone());
        }
        Ok(vec![
            ApiRequest::new("indices.create")
                .with_method(HttpMethod::Put)
                .with_data(json!({ "index": index, "body": body })),
        ])
    }

    /// Build and send the requests, toasting the outcome.
    pub async fn submit<C: ApiCaller, N: Notifier>(&self, caller: &C, notifier: &N) -> Result<()> {
        let requests = match self.build_requests().await {
            Ok(requests) => requests,
            Err(err @ ServiceError::Mapping(_)) => {
                notifier.add_danger(Toast::new(err.user_message()));
                return Err(err);
            }
            Err(err) => return Err(err),
        };
        let name = self
            .registry
            .get_value(&path("index")?)
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();

        for request in requests {
            let response = caller.call(request).await;
            if !response.ok {
                let message = response.error_message();
                let status = response.status();
                if response.is_security_exception() {
                    notifier.add_danger(Toast::new(message.clone()));
                    return Err(ServiceError::NoPermission(message));
                }
                notifier.add_danger(Toast::new(message.clone()));
                return Err(ServiceError::Api { message, status });
            }
        }

        let verb = if self.is_edit() { "updated" } else { "created" };
        notifier.add_success(&format!("{name} has been successfully {verb}."));
        info!(index = %name, verb, "index saved");
        Ok(())
    }
}
