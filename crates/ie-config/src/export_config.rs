use crate::{ConfigError, ConfigErrorResult};

use serde::Deserialize;

pub const MIN_BATCH_SIZE: usize = 1;
pub const MAX_BATCH_SIZE: usize = 10000;
pub const DEFAULT_BATCH_SIZE: usize = 100;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Page size for has-many association reads
    pub batch_size: usize,
    /// Write top-level collections as `.ndjson` side files instead of inline
    pub ndjson: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            ndjson: true,
        }
    }
}

impl ExportConfig {
    pub fn validate(&self) -> ConfigErrorResult<()> {
        if self.batch_size < MIN_BATCH_SIZE || self.batch_size > MAX_BATCH_SIZE {
            return Err(ConfigError::export(format!(
                "export.batch_size must be {}-{}, got {}",
                MIN_BATCH_SIZE, MAX_BATCH_SIZE, self.batch_size
            )));
        }

        Ok(())
    }
}
