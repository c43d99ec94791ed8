use crate::{ImportExportError, StoreError};

use std::path::Path;

use googletest::assert_that;
use googletest::prelude::{contains_substring, eq, not};

#[test]
fn given_version_mismatch_when_display_then_names_both_versions() {
    // When
    let error = ImportExportError::version_mismatch("0.2.4", "900.0");

    // Then
    assert_that!(
        error.to_string(),
        eq("Import version mismatch: Required 0.2.4 but was 900.0")
    );
    assert_that!(error.is_archive_invalid(), eq(true));
    assert_that!(error.is_fatal(), eq(true));
}

#[test]
fn given_transient_store_error_when_converted_then_retryable() {
    // When
    let error: ImportExportError = StoreError::transient("database is locked").into();

    // Then
    assert_that!(error.is_retryable(), eq(true));
    assert_that!(error.kind(), eq("TransientPersistenceError"));
    assert_that!(error.is_fatal(), eq(false));
}

#[test]
fn given_rejected_store_error_when_converted_then_not_retryable() {
    // When
    let error: ImportExportError = StoreError::rejected("title can't be blank").into();

    // Then
    assert_that!(error.is_retryable(), eq(false));
    assert_that!(error.kind(), eq("PersistenceError"));
}

#[test]
fn given_symlink_error_when_user_message_then_path_redacted() {
    // Given
    let error = ImportExportError::symlink_rejected(Path::new("/srv/imports/42/tree/evil"));

    // When
    let message = error.user_message();

    // Then
    assert_that!(message, not(contains_substring("/srv/imports")));
    assert_that!(message, contains_substring("[FILTERED]"));
    assert_that!(error.kind(), eq("SymlinkRejected"));
}
