//! Long-running operation notification (LRON) configuration.
//!
//! The engine stores one config per action; the settings page edits a
//! flattened "plain" view of each config and writes it back.

use serde::{Deserialize, Serialize};

/// Condition flags of a config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LronCondition {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub failure: bool,
}

/// A notification channel reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LronChannel {
    pub id: String,
}

/// Config as stored by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LronConfig {
    #[serde(default)]
    pub lron_condition: LronCondition,
    #[serde(default)]
    pub channels: Vec<LronChannel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
}

/// One entry of the `GET _plugins/_im/lron` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LronConfigEntry {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub lron_config: LronConfig,
}

/// Body of the `GET _plugins/_im/lron` response.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LronConfigListResponse {
    #[serde(default)]
    pub lron_configs: Vec<LronConfigEntry>,
    #[serde(default)]
    pub total_number: u64,
}

/// Flattened, editable view of one config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlainLronConfig {
    /// Position in the list, used to address registry fields.
    pub index: usize,
    pub title: String,
    pub action_name: String,
    pub success: bool,
    pub failure: bool,
    pub channels: Vec<String>,
}

/// Display titles for actions the settings page knows about.
const ACTION_TITLES: &[(&str, &str)] = &[
    ("indices:data/write/reindex", "reindex"),
    ("indices:admin/resize", "split / shrink"),
    ("indices:admin/open", "open"),
    ("indices:admin/forcemerge", "force merge"),
];

/// Human-readable title of an action, the action name itself when unknown.
pub fn action_title(action_name: &str) -> String {
    ACTION_TITLES
        .iter()
        .find(|(name, _)| *name == action_name)
        .map(|(_, title)| (*title).to_string())
        .unwrap_or_else(|| action_name.to_string())
}

/// Flatten engine configs. Configs without an action name (task-scoped
/// configs) are not part of the defaults page and are skipped.
pub fn config_list_to_plain_list(configs: &[LronConfig]) -> Vec<PlainLronConfig> {
    configs
        .iter()
        .filter_map(|config| config.action_name.as_deref().map(|name| (name, config)))
        .enumerate()
        .map(|(index, (action_name, config))| PlainLronConfig {
            index,
            title: action_title(action_name),
            action_name: action_name.to_string(),
            success: config.lron_condition.success,
            failure: config.lron_condition.failure,
            channels: config.channels.iter().map(|c| c.id.clone()).collect(),
        })
        .collect()
}

impl PlainLronConfig {
    /// Convert back to the engine representation.
    pub fn to_config(&self) -> LronConfig {
        LronConfig {
            lron_condition: LronCondition {
                success: self.success,
                failure: self.failure,
            },
            channels: self
                .channels
                .iter()
                .map(|id| LronChannel { id: id.clone() })
                .collect(),
            action_name: Some(self.action_name.clone()),
            task_id: None,
        }
    }

    /// Document id of the default config for this action.
    pub fn document_id(&self) -> String {
        format!("LRON:{}", self.action_name)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn flattens_response() {
        let raw = json!({
            "lron_configs": [
                {
                    "_id": "LRON:indices:data/write/reindex",
                    "lron_config": {
                        "lron_condition": { "success": true, "failure": false },
                        "channels": [{ "id": "slack" }],
                        "action_name": "indices:data/write/reindex"
                    }
                },
                {
                    "lron_config": {
                        "lron_condition": { "success": false, "failure": true },
                        "task_id": "node:1"
                    }
                },
                {
                    "lron_config": {
                        "lron_condition": {},
                        "action_name": "indices:admin/open"
                    }
                }
            ],
            "total_number": 3
        });
        let response: LronConfigListResponse = serde_json::from_value(raw).unwrap();
        let configs: Vec<LronConfig> = response
            .lron_configs
            .into_iter()
            .map(|entry| entry.lron_config)
            .collect();
        let plain = config_list_to_plain_list(&configs);

        assert_eq!(plain.len(), 2);
        assert_eq!(plain[0].index, 0);
        assert_eq!(plain[0].title, "reindex");
        assert_eq!(plain[0].channels, vec!["slack".to_string()]);
        assert_eq!(plain[1].index, 1);
        assert_eq!(plain[1].title, "open");
        assert!(!plain[1].success && !plain[1].failure);
    }

    #[test]
    fn plain_config_converts_back() {
        let plain = PlainLronConfig {
            index: 0,
            title: "reindex".to_string(),
            action_name: "indices:data/write/reindex".to_string(),
            success: true,
            failure: true,
            channels: vec!["a".to_string()],
        };
        let config = plain.to_config();
        assert!(config.lron_condition.success && config.lron_condition.failure);
        assert_eq!(config.channels[0].id, "a");
        assert_eq!(plain.document_id(), "LRON:indices:data/write/reindex");
    }

    #[test]
    fn unknown_action_uses_name_as_title() {
        assert_eq!(action_title("indices:admin/close"), "indices:admin/close");
    }
}
