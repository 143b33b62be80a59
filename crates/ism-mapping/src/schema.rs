//! Schema checks for mapping objects entered as JSON.

use ism_model::{MappingObject, allows_properties, effective_type, is_known_type};
use serde::Serialize;
use serde_json::Value;

use crate::error::{MappingError, Result};
use crate::node::{FIELD_NAME_KEY, PROPERTIES_KEY};

/// One schema violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaIssue {
    /// Object-form path of the offending field, e.g. `user.properties.name`.
    pub path: String,
    pub message: String,
}

impl From<SchemaIssue> for MappingError {
    fn from(issue: SchemaIssue) -> Self {
        Self::Schema {
            path: issue.path,
            message: issue.message,
        }
    }
}

/// Every violation in `object`, depth first in entry order.
pub fn schema_issues(object: &MappingObject) -> Vec<SchemaIssue> {
    let mut issues = Vec::new();
    check_level(object, "", &mut issues);
    issues
}

/// First violation in `object` as an error.
pub fn validate_mapping(object: &MappingObject) -> Result<()> {
    match schema_issues(object).into_iter().next() {
        Some(issue) => Err(issue.into()),
        None => Ok(()),
    }
}

fn check_level(object: &MappingObject, prefix: &str, issues: &mut Vec<SchemaIssue>) {
    for (name, settings) in object {
        let path = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{prefix}.{PROPERTIES_KEY}.{name}")
        };
        let issue = |issues: &mut Vec<SchemaIssue>, message: String| {
            issues.push(SchemaIssue {
                path: path.clone(),
                message,
            });
        };

        if name.is_empty() {
            issue(issues, "field name is required".to_string());
        }
        let Value::Object(settings) = settings else {
            issue(issues, "settings must be an object".to_string());
            continue;
        };
        if settings.contains_key(FIELD_NAME_KEY) {
            issue(issues, "'fieldName' is not a mapping parameter".to_string());
        }
        match settings.get("type") {
            None => {}
            Some(Value::String(field_type)) if is_known_type(field_type) => {}
            Some(Value::String(field_type)) => issue(issues, format!("unknown field type '{field_type}'")),
            Some(_) => issue(issues, "type must be a string".to_string()),
        }
        match settings.get(PROPERTIES_KEY) {
            None => {}
            Some(Value::Object(children)) => {
                let field_type = effective_type(settings);
                if !allows_properties(field_type) {
                    issue(issues, format!("type '{field_type}' cannot have properties"));
                }
                check_level(children, &path, issues);
            }
            Some(_) => issue(issues, "properties must be an object".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn object(value: Value) -> MappingObject {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn accepts_well_formed_mapping() {
        let mapping = object(json!({
            "title": { "type": "text", "analyzer": "standard" },
            "user": { "properties": { "name": { "type": "keyword" } } },
            "tags": { "type": "nested", "properties": { "v": { "type": "keyword" } } }
        }));
        assert!(schema_issues(&mapping).is_empty());
        assert!(validate_mapping(&mapping).is_ok());
    }

    #[test]
    fn reports_nested_paths() {
        let mapping = object(json!({
            "user": { "properties": { "name": { "type": "varchar" }, "age": 3 } },
            "title": { "type": "text", "properties": {} },
            "": { "type": 1 }
        }));
        let issues = schema_issues(&mapping);
        let paths: Vec<&str> = issues.iter().map(|i| i.path.as_str()).collect();
        assert_eq!(
            paths,
            ["user.properties.name", "user.properties.age", "title", "", ""]
        );
        assert_eq!(issues[0].message, "unknown field type 'varchar'");
        assert_eq!(issues[2].message, "type 'text' cannot have properties");
    }

    #[test]
    fn first_issue_becomes_error() {
        let mapping = object(json!({ "a": { "properties": [] } }));
        assert_eq!(
            validate_mapping(&mapping),
            Err(MappingError::Schema {
                path: "a".to_string(),
                message: "properties must be an object".to_string(),
            })
        );
    }
}
