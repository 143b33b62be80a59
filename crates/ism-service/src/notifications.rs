//! Notification settings page: default LRON configs per index operation.
//!
//! Load fetches the configs, flattens them into `dataSource` rows and
//! registers per-row fields. Submit validates, then writes each row back
//! with one `PUT` per config.

use futures_util::future::join_all;
use ism_form::{DirtyDiff, FieldRegistry, Rule, SubmitTracker, diff_lists};
use ism_model::{
    ApiRequest, FieldPath, HttpMethod, LronConfigListResponse, PlainLronConfig, ServerResponse,
    config_list_to_plain_list, segment_index,
};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::caller::{ApiCaller, decode};
use crate::error::{Result, ServiceError};
use crate::notifier::{Notifier, Toast};

/// Engine route of the LRON configs.
pub const LRON_PATH: &str = "/_plugins/_im/lron";

pub const CHANNELS_REQUIRED: &str = "One or more channels is required.";
pub const UPDATE_SUCCESS: &str =
    "Notifications settings for index operations have been successfully updated.";
pub const NO_PERMISSION_VIEW: &str = "You do not have permissions to view notification settings";
pub const NO_PERMISSION_UPDATE: &str =
    "You do not have permissions to update notification settings";
pub const NO_PERMISSION_HINT: &str = "Contact your administrator to request permissions.";

/// Registry key holding the rows.
const DATA_SOURCE: &str = "dataSource";

/// Rows are diffed by action.
const IDENTITY_FIELD: &str = "action_name";

/// Controller of the notification settings page.
pub struct NotificationSettings<C, N> {
    caller: C,
    notifier: N,
    registry: FieldRegistry,
    tracker: SubmitTracker,
    no_permission: bool,
}

impl<C: ApiCaller, N: Notifier> NotificationSettings<C, N> {
    pub fn new(caller: C, notifier: N) -> Self {
        Self {
            caller,
            notifier,
            registry: FieldRegistry::default(),
            tracker: SubmitTracker::new(),
            no_permission: false,
        }
    }

    pub fn registry(&self) -> &FieldRegistry {
        &self.registry
    }

    pub fn tracker(&self) -> &SubmitTracker {
        &self.tracker
    }

    /// Whether the engine refused to show the configs.
    pub fn has_no_permission(&self) -> bool {
        self.no_permission
    }

    /// Fetch configs and reset both the form and its original snapshot.
    pub async fn load(&mut self) -> Result<()> {
        self.tracker.start_load();
        let response = self
            .caller
            .call(ApiRequest::transport(HttpMethod::Get, LRON_PATH, None))
            .await;
        if self.tracker.is_detached() {
            debug!("page detached, dropping notification configs");
            return Ok(());
        }

        if !response.ok {
            self.tracker.load_failed();
            if response.status() == Some(403) {
                warn!("no permission to view notification settings");
                self.no_permission = true;
                return Err(ServiceError::NoPermission(NO_PERMISSION_VIEW.to_string()));
            }
            let message = response.error_message();
            self.notifier.add_danger(Toast::new(message.clone()));
            return Err(ServiceError::Api {
                message,
                status: response.status(),
            });
        }

        let list = match decode::<LronConfigListResponse>(response) {
            Ok(ServerResponse {
                response: Some(list),
                ..
            }) => list,
            Ok(_) => LronConfigListResponse::default(),
            Err(err) => {
                self.tracker.load_failed();
                self.notifier.add_danger(Toast::new(err.user_message()));
                return Err(err);
            }
        };
        let configs: Vec<_> = list.lron_configs.into_iter().map(|e| e.lron_config).collect();
        let rows = config_list_to_plain_list(&configs);
        let values = json!({ DATA_SOURCE: rows });

        self.registry.load(values);
        self.register_rows(rows.len())?;
        self.no_permission = false;
        self.tracker.load_complete();
        self.tracker.observe(&DirtyDiff::default());
        info!(rows = rows.len(), "notification settings loaded");
        Ok(())
    }

    /// Register the fields of `count` rows and drop those of rows past it.
    fn register_rows(&self, count: usize) -> Result<()> {
        for stale in self.registry.registered_paths() {
            let past_end = match stale.segments() {
                [root, index, ..] if root == DATA_SOURCE => {
                    segment_index(index).is_none_or(|index| index >= count)
                }
                _ => false,
            };
            if past_end {
                self.registry.unregister_field(&stale);
            }
        }
        for index in 0..count {
            let row = FieldPath::from_segments([DATA_SOURCE.to_string(), index.to_string()])?;
            let success = row.child("success")?;
            let failure = row.child("failure")?;
            let channels = row.child("channels")?;

            self.registry.register_field(success.clone(), vec![]);
            self.registry.register_field(failure.clone(), vec![]);
            self.registry.register_field(
                channels,
                vec![Rule::required_when(vec![success, failure], CHANNELS_REQUIRED)],
            );
        }
        Ok(())
    }

    /// Current rows.
    pub fn rows(&self) -> Vec<PlainLronConfig> {
        rows_of(&self.registry.get_values())
    }

    pub fn set_success(&mut self, index: usize, value: bool) -> Result<()> {
        let path = row_path(index, "success")?;
        self.registry.set_value(&path, Value::Bool(value))?;
        Ok(())
    }

    pub fn set_failure(&mut self, index: usize, value: bool) -> Result<()> {
        let path = row_path(index, "failure")?;
        self.registry.set_value(&path, Value::Bool(value))?;
        Ok(())
    }

    pub fn set_channels(&mut self, index: usize, channels: &[String]) -> Result<()> {
        let path = row_path(index, "channels")?;
        self.registry.set_value(&path, json!(channels))?;
        Ok(())
    }

    /// Changed rows against the last load.
    pub fn diff(&self) -> DirtyDiff {
        let current = data_source(&self.registry.get_values());
        let original = data_source(&self.registry.get_original_values());
        diff_lists(&current, &original, IDENTITY_FIELD)
    }

    /// Refresh and return the unsaved change count.
    pub fn unsaved_count(&mut self) -> usize {
        let diff = self.diff();
        self.tracker.observe(&diff);
        self.tracker.unsaved_count()
    }

    /// Validate and write every row back.
    ///
    /// Any failed write is an error, including envelopes with `ok: false`
    /// and no engine body.
    pub async fn submit(&mut self) -> Result<()> {
        if !self.tracker.can_submit() {
            debug!("submit ignored while busy");
            return Ok(());
        }
        let values = self.registry.validate().await.into_result()?;
        let rows = rows_of(&values);

        self.tracker.start_save();
        let requests = rows.iter().map(|row| {
            let path = format!("{LRON_PATH}/{}", encode_component(&row.document_id()));
            let body = json!({ "lron_config": row.to_config() });
            self.caller
                .call(ApiRequest::transport(HttpMethod::Put, path, Some(body)))
        });
        let responses = join_all(requests).await;

        let failures: Vec<&ServerResponse> = responses.iter().filter(|r| !r.ok).collect();
        if failures.is_empty() {
            self.tracker.save_complete();
            self.notifier.add_success(UPDATE_SUCCESS);
            info!(rows = rows.len(), "notification settings saved");
            return self.load().await;
        }

        self.tracker.save_failed();
        if failures.iter().any(|r| r.is_security_exception()) {
            self.notifier
                .add_danger(Toast::new(NO_PERMISSION_UPDATE).with_text(NO_PERMISSION_HINT));
            return Err(ServiceError::NoPermission(NO_PERMISSION_UPDATE.to_string()));
        }
        let first = failures[0];
        let message = first.error_message();
        warn!(failed = failures.len(), %message, "notification settings not saved");
        self.notifier.add_danger(Toast::new(message.clone()));
        Err(ServiceError::Api {
            message,
            status: first.status(),
        })
    }

    /// Discard edits.
    pub fn cancel(&mut self) {
        self.registry.cancel();
        let diff = self.diff();
        self.tracker.observe(&diff);
    }

    /// Mark the page as gone; in-flight loads are dropped.
    pub fn detach(&mut self) {
        self.tracker.detach();
    }
}

fn row_path(index: usize, field: &str) -> Result<FieldPath> {
    FieldPath::from_segments([DATA_SOURCE.to_string(), index.to_string(), field.to_string()])
        .map_err(Into::into)
}

fn data_source(values: &Value) -> Vec<Value> {
    values
        .get(DATA_SOURCE)
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

fn rows_of(values: &Value) -> Vec<PlainLronConfig> {
    data_source(values)
        .into_iter()
        .filter_map(|row| match serde_json::from_value(row) {
            Ok(row) => Some(row),
            Err(err) => {
                warn!(error = %err, "skipping malformed notification row");
                None
            }
        })
        .collect()
}

/// Percent-encode a path segment, leaving unreserved characters as is.
fn encode_component(segment: &str) -> String {
    let mut encoded = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.' | b'~') {
            encoded.push(char::from(byte));
        } else {
            encoded.push_str(&format!("%{byte:02X}"));
        }
    }
    encoded
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_document_ids() {
        assert_eq!(
            encode_component("LRON:indices:data/write/reindex"),
            "LRON%3Aindices%3Adata%2Fwrite%2Freindex"
        );
    }

    #[test]
    fn malformed_rows_are_skipped() {
        let values = json!({
            "dataSource": [
                { "index": 0, "title": "open", "action_name": "indices:admin/open",
                  "success": true, "failure": false, "channels": [] },
                { "index": "x" }
            ]
        });
        let rows = rows_of(&values);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].action_name, "indices:admin/open");
    }
}
