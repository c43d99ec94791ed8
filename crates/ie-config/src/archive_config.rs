use crate::{ConfigError, ConfigErrorResult};

use std::time::Duration;

use serde::Deserialize;

pub const DEFAULT_MAX_DECOMPRESSED_SIZE_MB: u64 = 10240;
pub const MAX_MAX_DECOMPRESSED_SIZE_MB: u64 = 1024 * 1024;

pub const MIN_DECOMPRESSION_TIMEOUT_SECS: u64 = 1;
pub const MAX_DECOMPRESSION_TIMEOUT_SECS: u64 = 86400;
pub const DEFAULT_DECOMPRESSION_TIMEOUT_SECS: u64 = 210;

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Archive safety settings.
///
/// Every check is on by default. A `max_decompressed_size_mb` of 0 means
/// no ceiling.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    pub max_decompressed_size_mb: u64,
    pub decompression_timeout_secs: u64,
    pub skip_size_check: bool,
    pub skip_path_check: bool,
    pub skip_version_check: bool,
    /// Leave the extracted directory on disk after import (debugging only)
    pub keep_extracted: bool,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            max_decompressed_size_mb: DEFAULT_MAX_DECOMPRESSED_SIZE_MB,
            decompression_timeout_secs: DEFAULT_DECOMPRESSION_TIMEOUT_SECS,
            skip_size_check: false,
            skip_path_check: false,
            skip_version_check: false,
            keep_extracted: false,
        }
    }
}

impl ArchiveConfig {
    pub fn validate(&self) -> ConfigErrorResult<()> {
        if self.max_decompressed_size_mb > MAX_MAX_DECOMPRESSED_SIZE_MB {
            return Err(ConfigError::archive(format!(
                "archive.max_decompressed_size_mb must be 0-{}, got {}",
                MAX_MAX_DECOMPRESSED_SIZE_MB, self.max_decompressed_size_mb
            )));
        }

        if self.decompression_timeout_secs < MIN_DECOMPRESSION_TIMEOUT_SECS
            || self.decompression_timeout_secs > MAX_DECOMPRESSION_TIMEOUT_SECS
        {
            return Err(ConfigError::archive(format!(
                "archive.decompression_timeout_secs must be {}-{}, got {}",
                MIN_DECOMPRESSION_TIMEOUT_SECS,
                MAX_DECOMPRESSION_TIMEOUT_SECS,
                self.decompression_timeout_secs
            )));
        }

        Ok(())
    }

    /// Ceiling in bytes, None when unlimited.
    pub fn max_decompressed_bytes(&self) -> Option<u64> {
        match self.max_decompressed_size_mb {
            0 => None,
            mb => Some(mb.saturating_mul(BYTES_PER_MB)),
        }
    }

    pub fn decompression_timeout(&self) -> Duration {
        Duration::from_secs(self.decompression_timeout_secs)
    }
}
