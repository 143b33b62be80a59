//! Integration tests for the offline commands.

use ism_cli::inspect::{
    FieldRow, check_mapping, diff_documents, mapping_to_nodes, nodes_to_mapping, parse_object,
};
use ism_form::EntryChange;
use serde_json::json;

const MAPPING: &str = r#"{
    "title": { "type": "text" },
    "user": { "properties": { "name": { "type": "keyword" } } }
}"#;

fn row(path: &str, field_type: &str, locked: bool) -> FieldRow {
    FieldRow {
        path: path.to_string(),
        field_type: field_type.to_string(),
        locked,
    }
}

#[test]
fn mapping_converts_to_nodes_and_back() {
    let nodes = mapping_to_nodes(MAPPING).unwrap();
    insta::assert_json_snapshot!(nodes, @r#"
    [
      {
        "fieldName": "title",
        "type": "text"
      },
      {
        "fieldName": "user",
        "properties": [
          {
            "fieldName": "name",
            "type": "keyword"
          }
        ]
      }
    ]
    "#);

    let text = serde_json::to_string(&nodes).unwrap();
    let object = nodes_to_mapping(&text).unwrap();
    assert_eq!(object, parse_object(MAPPING).unwrap());
}

#[test]
fn check_lists_fields_in_tree_order() {
    let report = check_mapping(MAPPING, None).unwrap();
    assert!(report.is_valid());
    assert_eq!(
        report.fields,
        vec![
            row("title", "text", false),
            row("user", "object", false),
            row("user.name", "keyword", false),
        ]
    );
}

#[test]
fn check_marks_saved_fields_locked() {
    let saved = parse_object(r#"{ "title": { "type": "text" } }"#).unwrap();
    let report = check_mapping(MAPPING, Some(saved)).unwrap();
    assert_eq!(report.fields[0], row("title", "text", true));
    assert!(report.fields[1..].iter().all(|field| !field.locked));
}

#[test]
fn check_rejects_dropping_a_saved_field() {
    let saved = parse_object(r#"{ "created": { "type": "date" } }"#).unwrap();
    assert!(check_mapping(MAPPING, Some(saved)).is_err());
}

#[test]
fn check_reports_schema_issues() {
    let report = check_mapping(r#"{ "title": { "type": "no-such-type" } }"#, None).unwrap();
    assert!(!report.is_valid());
    assert_eq!(report.issues.len(), 1);
    assert_eq!(report.issues[0].path, "title");
    assert!(report.fields.is_empty());
}

#[test]
fn lists_diff_by_identity() {
    let original = json!([
        { "action_name": "reindex", "success": true, "channels": ["a"] },
        { "action_name": "open", "success": false, "channels": [] }
    ]);
    let current = json!([
        { "action_name": "reindex", "success": true, "channels": ["a"] },
        { "action_name": "open", "success": true, "channels": [] }
    ]);

    let diff = diff_documents(&current, &original, "action_name").unwrap();

    assert_eq!(diff.count(), 1);
    assert!(matches!(diff.get("open"), Some(EntryChange::Modified(_))));
    assert_eq!(diff.get("reindex"), None);
}

#[test]
fn objects_diff_by_key() {
    let original = json!({ "a": { "x": 1 }, "b": { "x": 2 } });
    let current = json!({ "a": { "x": 1 }, "b": { "x": 3 }, "c": { "x": 4 } });

    let diff = diff_documents(&current, &original, "unused").unwrap();

    assert_eq!(diff.count(), 2);
    assert_eq!(diff.get("c"), Some(&EntryChange::Added));
    assert!(matches!(diff.get("b"), Some(EntryChange::Modified(_))));
}
