mod common;

use common::*;

use ie_core::RelationConfig;
use ie_engine::{DocumentReader, MethodRegistry, NdjsonWriter, TreeSerializer};

use std::sync::Arc;

use googletest::assert_that;
use googletest::prelude::{contains_substring, elements_are, eq, none, some};
use serde_json::{Value, json};

fn entries(reader: &DocumentReader, relation: &str) -> Vec<Value> {
    match reader.relation(relation).unwrap() {
        Some(entries) => entries.map(Result::unwrap).collect(),
        None => Vec::new(),
    }
}

#[tokio::test]
async fn given_project_when_serialized_then_only_permitted_attributes_written() {
    // Given
    let harness = Harness::new();
    let source = harness.seed_source_project();
    let dir = tempfile::tempdir().unwrap();

    // When
    harness.export_to(&source.root, dir.path(), true).await;

    // Then
    let reader = DocumentReader::open(dir.path(), "project").unwrap();
    assert_that!(reader.root().get("runners_token"), none());
    assert_that!(reader.root().get("id"), none());
    assert_that!(reader.root().get("name"), some(eq(&json!("Source"))));

    let labels = entries(&reader, "labels");
    assert_that!(labels.len(), eq(2));
    assert_that!(labels[0].get("project_id"), none());
    assert_that!(labels[0].get("type"), some(eq(&json!("ProjectLabel"))));
    assert_that!(labels[0].get("priorities"), some(eq(&json!([]))));
}

#[tokio::test]
async fn given_nested_relations_when_serialized_then_children_follow_tree_order() {
    // Given
    let harness = Harness::new();
    let source = harness.seed_source_project();
    let dir = tempfile::tempdir().unwrap();

    // When
    harness.export_to(&source.root, dir.path(), true).await;

    // Then
    let reader = DocumentReader::open(dir.path(), "project").unwrap();
    let issues = entries(&reader, "issues");
    let crash = issues[0].as_object().unwrap();
    let keys: Vec<&str> = crash
        .keys()
        .map(String::as_str)
        .filter(|key| ["events", "timelogs", "notes", "label_links", "milestone", "issue_assignees"].contains(key))
        .collect();
    assert_that!(
        keys,
        elements_are![eq(&"events"), eq(&"timelogs"), eq(&"notes"), eq(&"label_links"), eq(&"milestone"), eq(&"issue_assignees")]
    );
    assert_that!(crash["milestone"]["title"], eq(&json!("v1")));
    assert_that!(crash["notes"][0]["author"], eq(&json!({"name": "Alice"})));
    assert_that!(crash["notes"][1]["author"], eq(&Value::Null));
    assert_that!(crash["label_links"][0]["label"]["title"], eq(&json!("bug")));
}

#[tokio::test]
async fn given_declared_methods_when_serialized_then_computed_values_written() {
    // Given
    let harness = Harness::new();
    let source = harness.seed_source_project();
    let dir = tempfile::tempdir().unwrap();

    // When
    harness.export_to(&source.root, dir.path(), true).await;

    // Then
    let reader = DocumentReader::open(dir.path(), "project").unwrap();
    let mr = &entries(&reader, "merge_requests")[0];
    let diff = &mr["merge_request_diff"];
    assert_that!(diff["utf8_st_diffs"], eq(&json!("diff --git")));
    assert_that!(diff["merge_request_diff_files"][0]["utf8_diff"], eq(&json!("+fn main() {}")));
}

#[tokio::test]
async fn given_absent_has_one_when_serialized_then_written_as_null() {
    // Given
    let harness = Harness::new();
    let source = harness.seed_source_project();
    let dir = tempfile::tempdir().unwrap();

    // When
    harness.export_to(&source.root, dir.path(), true).await;

    // Then
    let reader = DocumentReader::open(dir.path(), "project").unwrap();
    assert_that!(reader.root().get("ci_cd_settings"), some(eq(&Value::Null)));
    assert_that!(
        reader.root().get("project_feature").and_then(|f| f.get("issues_access_level")),
        some(eq(&json!(20)))
    );
    assert_that!(reader.batched_relations().unwrap().contains(&"project_feature".to_string()), eq(false));
}

#[tokio::test]
async fn given_undecodable_record_when_serialized_then_skipped_and_export_continues() {
    // Given
    let harness = Harness::new();
    let source = harness.seed_source_project();
    harness.store.corrupt(source.crash_issue.id.unwrap());
    let dir = tempfile::tempdir().unwrap();

    // When
    let counts = harness.export_to(&source.root, dir.path(), true).await;

    // Then
    let issues = counts.get("issues").copied().unwrap_or_default();
    assert_that!(issues.created, eq(1));
    assert_that!(issues.skipped, eq(1));
    let reader = DocumentReader::open(dir.path(), "project").unwrap();
    let titles: Vec<Value> = entries(&reader, "issues").iter().map(|i| i["title"].clone()).collect();
    assert_that!(titles, elements_are![eq(&json!("Dark mode"))]);
    assert_that!(entries(&reader, "merge_requests").len(), eq(1));
}

#[tokio::test]
async fn given_undecodable_top_level_has_one_when_serialized_then_null_and_export_continues() {
    // Given
    let harness = Harness::new();
    let source = harness.seed_source_project();
    let feature = harness.store.children_of(source.root.id.unwrap(), "project_feature");
    harness.store.corrupt(feature[0].id.unwrap());
    let dir = tempfile::tempdir().unwrap();

    // When
    let counts = harness.export_to(&source.root, dir.path(), true).await;

    // Then
    let skipped = counts.get("project_feature").copied().unwrap_or_default();
    assert_that!(skipped.skipped, eq(1));
    let reader = DocumentReader::open(dir.path(), "project").unwrap();
    assert_that!(reader.root().get("project_feature"), some(eq(&Value::Null)));
    assert_that!(entries(&reader, "issues").len(), eq(2));
}

#[tokio::test]
async fn given_hash_attribute_on_deny_list_relation_when_serialized_then_exported() {
    // Given
    let harness = Harness::new();
    let source = harness.seed_source_project();
    harness.store.set_attribute(
        source.merge_request.id.unwrap(),
        "merge_params",
        json!({"force_remove_source_branch": "1"}),
    );
    let dir = tempfile::tempdir().unwrap();

    // When
    harness.export_to(&source.root, dir.path(), true).await;

    // Then
    let reader = DocumentReader::open(dir.path(), "project").unwrap();
    let merge_requests = entries(&reader, "merge_requests");
    assert_that!(
        merge_requests[0].get("merge_params"),
        some(eq(&json!({"force_remove_source_branch": "1"})))
    );
}

#[tokio::test]
async fn given_batch_size_smaller_than_relation_when_serialized_then_every_page_written() {
    // Given
    let harness = Harness::new();
    let source = harness.seed_source_project();
    for n in 0..5 {
        harness.store.seed_child(
            &source.root,
            "milestones",
            "Milestone",
            json!({"title": format!("m{}", n)}),
        );
    }
    let dir = tempfile::tempdir().unwrap();
    let serializer = harness.serializer(1);
    let mut writer = NdjsonWriter::new(dir.path().to_path_buf(), "project");

    // When
    let counts = serializer.serialize(&source.root, &mut writer).await.unwrap();

    // Then
    assert_that!(counts.get("milestones").map(|c| c.created), some(eq(6)));
    let reader = DocumentReader::open(dir.path(), "project").unwrap();
    assert_that!(entries(&reader, "milestones").len(), eq(6));
}

#[tokio::test]
async fn given_legacy_writer_when_serialized_then_single_document_with_inline_relations() {
    // Given
    let harness = Harness::new();
    let source = harness.seed_source_project();
    let dir = tempfile::tempdir().unwrap();

    // When
    harness.export_to(&source.root, dir.path(), false).await;

    // Then
    assert!(dir.path().join("project.json").is_file());
    assert!(!dir.path().join("tree").exists());
    let reader = DocumentReader::open(dir.path(), "project").unwrap();
    assert_that!(reader.is_ndjson(), eq(false));
    assert_that!(reader.root().get("issues").and_then(Value::as_array).map(Vec::len), some(eq(2)));
}

#[test]
fn given_zero_batch_size_when_new_then_config_error() {
    // Given
    let harness = Harness::new();

    // When
    let result = TreeSerializer::new(
        harness.object_store(),
        Arc::new(RelationConfig::default_project().unwrap()),
        MethodRegistry::with_defaults(),
        0,
    );

    // Then
    match result {
        Err(e) => assert_that!(e.to_string(), contains_substring("batch size")),
        Ok(_) => panic!("expected a config error"),
    }
}

#[test]
fn given_registry_missing_declared_method_when_new_then_config_error() {
    // Given
    let harness = Harness::new();

    // When
    let result = TreeSerializer::new(
        harness.object_store(),
        Arc::new(RelationConfig::default_project().unwrap()),
        MethodRegistry::new(),
        10,
    );

    // Then
    assert!(result.is_err());
}
