mod common;

use common::CraftedArchive;

use ie_archive::{ArchiveGate, ArchiveSaver, VERSION};
use ie_config::ArchiveConfig;

use googletest::prelude::*;
use tempfile::TempDir;

#[tokio::test]
async fn given_saved_export_when_opened_then_trusted_with_files() {
    // Given
    let work = TempDir::new().unwrap();
    let export_dir = work.path().join("export");
    std::fs::create_dir_all(export_dir.join("tree/project")).unwrap();
    std::fs::write(export_dir.join("tree/project.json"), r#"{"name":"p"}"#).unwrap();
    std::fs::write(export_dir.join("tree/project/issues.ndjson"), "{}\n").unwrap();
    let archive = ArchiveSaver::new(&export_dir)
        .save("group/p", &work.path().join("out"))
        .unwrap();
    let extract_dir = work.path().join("import");

    // When
    let trusted = ArchiveGate::new(ArchiveConfig::default())
        .open(&archive, &extract_dir)
        .await
        .unwrap();

    // Then
    let file_name = archive.file_name().unwrap().to_string_lossy().into_owned();
    assert_that!(file_name, ends_with("_group_p_export.tar.gz"));
    assert_that!(
        std::fs::read_to_string(trusted.dir().join("VERSION")).unwrap(),
        eq(VERSION)
    );
    assert_that!(trusted.dir().join("tree/project/issues.ndjson").exists(), eq(true));
    trusted.cleanup();
    assert_that!(extract_dir.exists(), eq(false));
}

#[tokio::test]
async fn given_future_version_when_opened_then_rejected_naming_both_versions() {
    // Given
    let work = TempDir::new().unwrap();
    let archive = CraftedArchive::create(&work.path().join("future.tar.gz"))
        .file("VERSION", b"900.0")
        .finish();
    let extract_dir = work.path().join("import");

    // When
    let error = ArchiveGate::new(ArchiveConfig::default())
        .open(&archive, &extract_dir)
        .await
        .unwrap_err();

    // Then
    assert_that!(
        error.to_string(),
        eq("Import version mismatch: Required 0.2.4 but was 900.0")
    );
    assert_that!(extract_dir.exists(), eq(false));
}

#[tokio::test]
async fn given_version_check_skipped_when_opened_then_mismatch_tolerated() {
    // Given
    let work = TempDir::new().unwrap();
    let archive = CraftedArchive::create(&work.path().join("future.tar.gz"))
        .file("VERSION", b"900.0")
        .finish();
    let config = ArchiveConfig {
        skip_version_check: true,
        ..ArchiveConfig::default()
    };

    // When
    let result = ArchiveGate::new(config)
        .open(&archive, &work.path().join("import"))
        .await;

    // Then
    assert!(result.is_ok());
}

#[tokio::test]
async fn given_oversized_payload_when_opened_then_rejected_before_extraction() {
    // Given
    let work = TempDir::new().unwrap();
    let archive = CraftedArchive::create(&work.path().join("bomb.tar.gz"))
        .file("VERSION", VERSION.as_bytes())
        .file("big.bin", &vec![0u8; 3 * 1024 * 1024])
        .finish();
    let config = ArchiveConfig {
        max_decompressed_size_mb: 1,
        ..ArchiveConfig::default()
    };
    let extract_dir = work.path().join("import");

    // When
    let error = ArchiveGate::new(config)
        .open(&archive, &extract_dir)
        .await
        .unwrap_err();

    // Then
    assert_that!(error.is_archive_invalid(), eq(true));
    assert_that!(extract_dir.join("big.bin").exists(), eq(false));
}

#[tokio::test]
async fn given_symlink_archive_when_opened_then_rejected() {
    // Given
    let work = TempDir::new().unwrap();
    let archive = CraftedArchive::create(&work.path().join("evil.tar.gz"))
        .file("VERSION", VERSION.as_bytes())
        .symlink("tree", "../../etc")
        .finish();
    let extract_dir = work.path().join("import");

    // When
    let error = ArchiveGate::new(ArchiveConfig::default())
        .open(&archive, &extract_dir)
        .await
        .unwrap_err();

    // Then
    assert_that!(error.is_archive_invalid(), eq(true));
    assert_that!(extract_dir.exists(), eq(false));
}
