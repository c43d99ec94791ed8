mod archive_config;
mod config;
mod database_config;
mod error;
mod export_config;
mod log_level;
mod logging_config;
mod retry_config;

#[cfg(test)]
mod tests;

pub use archive_config::ArchiveConfig;
pub use config::Config;
pub use database_config::DatabaseConfig;
pub use error::{ConfigError, ConfigErrorResult};
pub use export_config::ExportConfig;
pub use log_level::LogLevel;
pub use logging_config::LoggingConfig;
pub use retry_config::RetryConfig;

const DEFAULT_DATABASE_FILENAME: &str = "import_export.db";
const DEFAULT_LOG_LEVEL_STRING: &str = "info";
const DEFAULT_LOG_LEVEL: log::LevelFilter = log::LevelFilter::Info;
const DEFAULT_LOG_DIRECTORY: &str = "log";
const DEFAULT_LOG_COLORED: bool = true;

const CONFIG_DIR_ENV: &str = "IE_CONFIG_DIR";
const CONFIG_DIR_NAME: &str = ".ie";
const CONFIG_FILE_NAME: &str = "config.toml";
