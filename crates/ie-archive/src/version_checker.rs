use ie_core::{ImportExportError, Result};

use std::path::Path;

use log::info;

/// Format version written into, and required from, every archive.
pub const VERSION: &str = "0.2.4";
pub const VERSION_FILE: &str = "VERSION";

pub struct VersionChecker {
    required: String,
}

impl Default for VersionChecker {
    fn default() -> Self {
        Self::new(VERSION)
    }
}

impl VersionChecker {
    pub fn new<S: Into<String>>(required: S) -> Self {
        Self {
            required: required.into(),
        }
    }

    pub fn required(&self) -> &str {
        &self.required
    }

    /// Exact comparison; newer and older versions both fail.
    pub fn check(&self, extracted_dir: &Path) -> Result<()> {
        let path = extracted_dir.join(VERSION_FILE);
        if !path.is_file() {
            return Err(ImportExportError::archive_invalid(
                "archive does not contain a VERSION file",
            ));
        }

        let found = std::fs::read_to_string(&path)?;
        let found = found.trim_end();
        if found != self.required {
            return Err(ImportExportError::version_mismatch(
                self.required.as_str(),
                found,
            ));
        }

        info!("Archive version {} accepted", found);
        Ok(())
    }
}
