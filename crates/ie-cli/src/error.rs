use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Config error: {0}")]
    Config(#[from] ie_config::ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] ie_db::DbError),

    #[error("{0}")]
    Engine(#[from] ie_core::ImportExportError),

    #[error("Failed to read relation tree {path}: {source}")]
    TreeFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid argument: {message}")]
    Argument { message: String },

    #[error("Logger error: {message}")]
    Logger { message: String },

    #[error("Failed to serialize report: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    pub fn argument<S: Into<String>>(message: S) -> Self {
        CliError::Argument {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CliError>;
