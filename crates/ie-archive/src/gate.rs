use crate::{
    ArchiveState, DecompressedSizeValidator, FileImporter, PathValidator, VersionChecker,
};

use ie_config::ArchiveConfig;
use ie_core::{ImportExportError, Result};

use std::path::{Path, PathBuf};

use log::{info, warn};
use tokio_util::sync::CancellationToken;

/// An extracted archive that passed every enabled check.
#[derive(Debug)]
pub struct TrustedArchive {
    dir: PathBuf,
    keep: bool,
}

impl TrustedArchive {
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Remove the extracted files unless configured to keep them.
    pub fn cleanup(self) {
        if self.keep {
            info!("Keeping extracted archive at {}", self.dir.display());
            return;
        }
        if let Err(e) = std::fs::remove_dir_all(&self.dir) {
            warn!("Failed to remove extracted archive: {}", e);
        }
    }
}

/// Drives one archive through the validation states up to `Trusted`.
pub struct ArchiveGate {
    config: ArchiveConfig,
    version: VersionChecker,
    cancel: CancellationToken,
}

impl ArchiveGate {
    pub fn new(config: ArchiveConfig) -> Self {
        Self {
            config,
            version: VersionChecker::default(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_version_checker(mut self, version: VersionChecker) -> Self {
        self.version = version;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub async fn open(&self, archive: &Path, extract_dir: &Path) -> Result<TrustedArchive> {
        let mut state = ArchiveState::Unvalidated;
        match self.run(&mut state, archive, extract_dir).await {
            Ok(()) => {
                info!("Archive {}", state);
                Ok(TrustedArchive {
                    dir: extract_dir.to_path_buf(),
                    keep: self.config.keep_extracted,
                })
            }
            Err(e) => {
                warn!("Archive rejected while {}: {}", state, e);
                state.reject();
                if extract_dir.exists()
                    && let Err(cleanup) = std::fs::remove_dir_all(extract_dir)
                {
                    warn!("Failed to remove rejected archive files: {}", cleanup);
                }
                Err(e)
            }
        }
    }

    async fn run(&self, state: &mut ArchiveState, archive: &Path, extract_dir: &Path) -> Result<()> {
        if self.config.skip_size_check {
            warn!("Decompressed size check skipped by configuration");
        } else {
            let validator = DecompressedSizeValidator::new(
                self.config.max_decompressed_bytes(),
                self.config.decompression_timeout(),
            )
            .with_cancellation(self.cancel.clone());
            if !validator.is_valid(archive).await {
                return Err(ImportExportError::archive_invalid(
                    "Decompressed archive size validation failed.",
                ));
            }
        }
        state.advance(ArchiveState::SizeChecked)?;

        let archive_path = archive.to_path_buf();
        let dir = extract_dir.to_path_buf();
        tokio::task::spawn_blocking(move || FileImporter::new().extract(&archive_path, &dir))
            .await
            .map_err(|e| ImportExportError::archive_invalid(format!("extraction task failed: {}", e)))??;

        if self.config.skip_path_check {
            warn!("Extracted path check skipped by configuration");
        } else {
            PathValidator::new(extract_dir)?.validate()?;
        }
        state.advance(ArchiveState::StructureChecked)?;

        if self.config.skip_version_check {
            warn!("Archive version check skipped by configuration");
        } else {
            self.version.check(extract_dir)?;
        }
        state.advance(ArchiveState::VersionChecked)?;

        state.advance(ArchiveState::Trusted)
    }
}
