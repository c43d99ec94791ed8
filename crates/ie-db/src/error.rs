use ie_core::{ErrorLocation, StoreError};

use std::panic::Location;

use thiserror::Error;

// SQLite primary result codes; extended codes keep them in the low byte
const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;
const PRIMARY_CODE_MASK: i32 = 0xff;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLx error: {source} {location}")]
    Sqlx {
        source: sqlx::Error,
        location: ErrorLocation,
    },

    #[error("Stored JSON is invalid: {source} {location}")]
    Json {
        source: serde_json::Error,
        location: ErrorLocation,
    },

    #[error("Cannot decode stored {column}: {message} {location}")]
    Decode {
        column: &'static str,
        message: String,
        location: ErrorLocation,
    },

    #[error("Migration error: {message} {location}")]
    Migration {
        message: String,
        location: ErrorLocation,
    },

    #[error("Database initialization failed: {message} {location}")]
    Initialization {
        message: String,
        location: ErrorLocation,
    },
}

impl DbError {
    /// Busy or locked database, or an exhausted pool.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Sqlx {
                source: sqlx::Error::PoolTimedOut,
                ..
            } => true,
            Self::Sqlx {
                source: sqlx::Error::Database(db),
                ..
            } => db
                .code()
                .and_then(|code| code.parse::<i32>().ok())
                .is_some_and(|code| matches!(code & PRIMARY_CODE_MASK, SQLITE_BUSY | SQLITE_LOCKED)),
            _ => false,
        }
    }

    fn is_constraint(&self) -> bool {
        matches!(self, Self::Sqlx { source: sqlx::Error::Database(db), .. }
            if db.is_unique_violation() || db.is_foreign_key_violation() || db.is_check_violation())
    }
}

impl From<sqlx::Error> for DbError {
    #[track_caller]
    fn from(source: sqlx::Error) -> Self {
        Self::Sqlx {
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<serde_json::Error> for DbError {
    #[track_caller]
    fn from(source: serde_json::Error) -> Self {
        Self::Json {
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<DbError> for StoreError {
    #[track_caller]
    fn from(error: DbError) -> Self {
        if error.is_transient() {
            StoreError::transient(error.to_string())
        } else if error.is_constraint() {
            StoreError::rejected(error.to_string())
        } else {
            StoreError::backend(error.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, DbError>;
