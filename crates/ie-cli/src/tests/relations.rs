use crate::{CliError, load_relations};

use std::io::Write;
use std::path::Path;

use googletest::assert_that;
use googletest::prelude::eq;

#[test]
fn given_no_flags_when_load_relations_then_project_tree() {
    let relations = load_relations(false, None).unwrap();

    assert_that!(relations.root_name(), eq("project"));
    assert!(relations.is_known("merge_requests"));
}

#[test]
fn given_group_flag_when_load_relations_then_group_tree() {
    let relations = load_relations(true, None).unwrap();

    assert_that!(relations.root_name(), eq("group"));
    assert!(relations.is_known("boards"));
}

#[test]
fn given_extension_file_when_load_relations_then_relation_is_added() {
    // Given
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "tree:\n  project:\n    - wiki_pages").unwrap();

    // When
    let relations = load_relations(false, Some(file.path())).unwrap();

    // Then
    assert!(relations.is_known("wiki_pages"));
    assert!(relations.is_known("issues"));
}

#[test]
fn given_missing_extension_file_when_load_relations_then_tree_file_error() {
    // When
    let result = load_relations(false, Some(Path::new("/nonexistent/extra.yml")));

    // Then
    assert!(matches!(result, Err(CliError::TreeFile { .. })));
}

#[test]
fn given_extension_for_other_root_when_load_relations_then_engine_error() {
    // Given
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "tree:\n  group:\n    - epics").unwrap();

    // When
    let result = load_relations(false, Some(file.path()));

    // Then
    assert!(matches!(result, Err(CliError::Engine(_))));
}
