use ie_core::{ImportExportError, Result};

use std::fs::{self, Metadata};
use std::path::{Path, PathBuf};

use log::debug;
use walkdir::WalkDir;

/// On-disk checks over an extracted export directory.
pub struct PathValidator {
    root: PathBuf,
}

impl PathValidator {
    pub fn new(root: &Path) -> Result<Self> {
        Ok(Self {
            root: fs::canonicalize(root)?,
        })
    }

    /// Reject symlinks, multiply linked files and anything outside the root.
    pub fn validate(&self) -> Result<()> {
        let mut checked = 0usize;
        for entry in WalkDir::new(&self.root).follow_links(false) {
            let entry = entry.map_err(|e| ImportExportError::archive_invalid(e.to_string()))?;
            self.validate_path(entry.path())?;
            checked += 1;
        }
        debug!("Validated {} extracted paths", checked);
        Ok(())
    }

    pub fn validate_path(&self, path: &Path) -> Result<()> {
        let metadata = fs::symlink_metadata(path)?;
        if metadata.file_type().is_symlink() {
            return Err(ImportExportError::symlink_rejected(path));
        }
        if metadata.is_file() && link_count(&metadata) > 1 {
            return Err(ImportExportError::hard_link(path));
        }

        let resolved = fs::canonicalize(path)?;
        if !resolved.starts_with(&self.root) {
            return Err(ImportExportError::path_traversal(path));
        }
        Ok(())
    }
}

#[cfg(unix)]
fn link_count(metadata: &Metadata) -> u64 {
    use std::os::unix::fs::MetadataExt;
    metadata.nlink()
}

#[cfg(not(unix))]
fn link_count(_metadata: &Metadata) -> u64 {
    1
}
