use crate::{
    ArchiveConfig, CONFIG_DIR_ENV, CONFIG_DIR_NAME, CONFIG_FILE_NAME, ConfigError,
    ConfigErrorResult, DatabaseConfig, ExportConfig, LoggingConfig, RetryConfig,
};

use std::path::{Path, PathBuf};

use log::info;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub logging: LoggingConfig,
    pub database: DatabaseConfig,
    pub retry: RetryConfig,
    pub archive: ArchiveConfig,
    pub export: ExportConfig,
}

impl Config {
    /// Load config.
    ///
    /// Loading order:
    /// 1. IE_CONFIG_DIR env var, else ./.ie/
    /// 2. Auto-create the config directory
    /// 3. config.toml if present, else defaults
    /// 4. IE_* environment variable overrides
    ///
    /// Does NOT validate - call validate() after load().
    pub fn load() -> ConfigErrorResult<Self> {
        let config_dir = Self::config_dir()?;

        if !config_dir.exists() {
            std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::Io {
                path: config_dir.clone(),
                source: e,
            })?;
        }

        let config_path = config_dir.join(CONFIG_FILE_NAME);

        let mut config = if config_path.exists() {
            Self::load_toml(&config_path)?
        } else {
            Config::default()
        };

        config.apply_env_overrides();

        Ok(config)
    }

    fn load_toml(path: &Path) -> ConfigErrorResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::Toml {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Priority: IE_CONFIG_DIR env var > ./.ie/ (relative to cwd)
    pub fn config_dir() -> ConfigErrorResult<PathBuf> {
        if let Ok(dir) = std::env::var(CONFIG_DIR_ENV) {
            return Ok(PathBuf::from(dir));
        }

        let cwd = std::env::current_dir()
            .map_err(|_| ConfigError::config("Cannot determine current working directory"))?;
        Ok(cwd.join(CONFIG_DIR_NAME))
    }

    pub fn validate(&self) -> ConfigErrorResult<()> {
        self.retry.validate()?;
        self.archive.validate()?;
        self.export.validate()?;
        self.database.validate()?;
        self.logging.validate()
    }

    /// Absolute path to the database file.
    pub fn database_path(&self) -> ConfigErrorResult<PathBuf> {
        Ok(self.database.resolve_in(&Self::config_dir()?))
    }

    pub fn log_summary(&self) {
        info!("Configuration loaded:");
        info!("  database: {}", self.database.path);
        info!(
            "  logging: {} (colored: {}, file: {})",
            *self.logging.level,
            self.logging.colored,
            self.logging.file.as_deref().unwrap_or("stdout")
        );
        info!(
            "  retry: attempts={}, initial={}ms, max={}s, backoff={}x",
            self.retry.max_attempts,
            self.retry.initial_delay_ms,
            self.retry.max_delay_secs,
            self.retry.backoff_multiplier
        );

        let ceiling = match self.archive.max_decompressed_size_mb {
            0 => String::from("unlimited"),
            mb => format!("{}MB", mb),
        };
        info!(
            "  archive: max_decompressed={}, timeout={}s, checks(size={}, path={}, version={})",
            ceiling,
            self.archive.decompression_timeout_secs,
            !self.archive.skip_size_check,
            !self.archive.skip_path_check,
            !self.archive.skip_version_check
        );
        info!(
            "  export: batch_size={}, ndjson={}",
            self.export.batch_size, self.export.ndjson
        );
    }

    fn apply_env_overrides(&mut self) {
        // Database
        Self::apply_env_string("IE_DATABASE_PATH", &mut self.database.path);

        // Logging
        Self::apply_env_parse("IE_LOG_LEVEL", &mut self.logging.level);
        Self::apply_env_bool("IE_LOG_COLORED", &mut self.logging.colored);
        Self::apply_env_string("IE_LOG_DIR", &mut self.logging.dir);
        Self::apply_env_option_string("IE_LOG_FILE", &mut self.logging.file);

        // Retry
        Self::apply_env_parse("IE_RETRY_MAX_ATTEMPTS", &mut self.retry.max_attempts);
        Self::apply_env_parse(
            "IE_RETRY_INITIAL_DELAY_MS",
            &mut self.retry.initial_delay_ms,
        );
        Self::apply_env_parse("IE_RETRY_MAX_DELAY_SECS", &mut self.retry.max_delay_secs);
        Self::apply_env_parse(
            "IE_RETRY_BACKOFF_MULTIPLIER",
            &mut self.retry.backoff_multiplier,
        );
        Self::apply_env_bool("IE_RETRY_JITTER", &mut self.retry.jitter);

        // Archive
        Self::apply_env_parse(
            "IE_ARCHIVE_MAX_DECOMPRESSED_SIZE_MB",
            &mut self.archive.max_decompressed_size_mb,
        );
        Self::apply_env_parse(
            "IE_ARCHIVE_DECOMPRESSION_TIMEOUT_SECS",
            &mut self.archive.decompression_timeout_secs,
        );
        Self::apply_env_bool(
            "IE_ARCHIVE_SKIP_SIZE_CHECK",
            &mut self.archive.skip_size_check,
        );
        Self::apply_env_bool(
            "IE_ARCHIVE_SKIP_PATH_CHECK",
            &mut self.archive.skip_path_check,
        );
        Self::apply_env_bool(
            "IE_ARCHIVE_SKIP_VERSION_CHECK",
            &mut self.archive.skip_version_check,
        );
        Self::apply_env_bool("IE_ARCHIVE_KEEP_EXTRACTED", &mut self.archive.keep_extracted);

        // Export
        Self::apply_env_parse("IE_EXPORT_BATCH_SIZE", &mut self.export.batch_size);
        Self::apply_env_bool("IE_EXPORT_NDJSON", &mut self.export.ndjson);
    }

    fn apply_env_string(var_name: &str, target: &mut String) {
        if let Ok(val) = std::env::var(var_name) {
            *target = val;
        }
    }

    /// Accepts "true"/"1"
    fn apply_env_bool(var_name: &str, target: &mut bool) {
        if let Ok(val) = std::env::var(var_name) {
            *target = val == "true" || val == "1";
        }
    }

    fn apply_env_parse<T: std::str::FromStr>(var_name: &str, target: &mut T) {
        if let Ok(val) = std::env::var(var_name)
            && let Ok(parsed) = val.parse()
        {
            *target = parsed;
        }
    }

    fn apply_env_option_string(var_name: &str, target: &mut Option<String>) {
        if let Ok(val) = std::env::var(var_name) {
            *target = Some(val);
        }
    }
}
