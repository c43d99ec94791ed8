use crate::redact::redact_paths;
use crate::store::StoreError;

use std::panic::Location;
use std::path::{Path, PathBuf};
use std::result::Result as StdResult;

use error_location::ErrorLocation;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImportExportError {
    #[error("Relation config error: {message} {location}")]
    Config {
        message: String,
        location: ErrorLocation,
    },

    #[error("Archive invalid: {message} {location}")]
    ArchiveInvalid {
        message: String,
        location: ErrorLocation,
    },

    #[error("Unknown relation '{relation}': no permitted attributes are defined for it")]
    UnknownRelation {
        relation: String,
        location: ErrorLocation,
    },

    #[error("Transient persistence error: {message} {location}")]
    TransientPersistence {
        message: String,
        location: ErrorLocation,
    },

    #[error("Persistence error: {message} {location}")]
    Persistence {
        message: String,
        location: ErrorLocation,
    },

    #[error("Encoding error: {message} {location}")]
    Encoding {
        message: String,
        location: ErrorLocation,
    },

    #[error("Hard link rejected: {} {location}", .path.display())]
    HardLink {
        path: PathBuf,
        location: ErrorLocation,
    },

    #[error("Symlink rejected: {} {location}", .path.display())]
    SymlinkRejected {
        path: PathBuf,
        location: ErrorLocation,
    },

    #[error("Path escapes the export directory: {} {location}", .path.display())]
    PathTraversal {
        path: PathBuf,
        location: ErrorLocation,
    },

    #[error("Import version mismatch: Required {required} but was {found}")]
    VersionMismatch {
        required: String,
        found: String,
        location: ErrorLocation,
    },

    #[error("invalid import format: {message}")]
    InvalidFormat {
        message: String,
        location: ErrorLocation,
    },

    #[error("IO error: {source} {location}")]
    Io {
        #[source]
        source: std::io::Error,
        location: ErrorLocation,
    },

    #[error("JSON error: {source} {location}")]
    Json {
        #[source]
        source: serde_json::Error,
        location: ErrorLocation,
    },

    #[error("Store error: {source} {location}")]
    Store {
        #[source]
        source: StoreError,
        location: ErrorLocation,
    },
}

impl ImportExportError {
    #[track_caller]
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn archive_invalid<S: Into<String>>(message: S) -> Self {
        Self::ArchiveInvalid {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn unknown_relation<S: Into<String>>(relation: S) -> Self {
        Self::UnknownRelation {
            relation: relation.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn transient<S: Into<String>>(message: S) -> Self {
        Self::TransientPersistence {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn persistence<S: Into<String>>(message: S) -> Self {
        Self::Persistence {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn encoding<S: Into<String>>(message: S) -> Self {
        Self::Encoding {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn hard_link(path: &Path) -> Self {
        Self::HardLink {
            path: path.to_path_buf(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn symlink_rejected(path: &Path) -> Self {
        Self::SymlinkRejected {
            path: path.to_path_buf(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn path_traversal(path: &Path) -> Self {
        Self::PathTraversal {
            path: path.to_path_buf(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn version_mismatch<R: Into<String>, F: Into<String>>(required: R, found: F) -> Self {
        Self::VersionMismatch {
            required: required.into(),
            found: found.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn invalid_format<S: Into<String>>(message: S) -> Self {
        Self::InvalidFormat {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    /// Only contention-style persistence failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransientPersistence { .. })
    }

    /// Errors that stop the whole job rather than a single relation entry.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Config { .. }
                | Self::ArchiveInvalid { .. }
                | Self::UnknownRelation { .. }
                | Self::HardLink { .. }
                | Self::SymlinkRejected { .. }
                | Self::PathTraversal { .. }
                | Self::VersionMismatch { .. }
                | Self::InvalidFormat { .. }
        )
    }

    /// Any failure of the archive safety layer.
    pub fn is_archive_invalid(&self) -> bool {
        matches!(
            self,
            Self::ArchiveInvalid { .. }
                | Self::HardLink { .. }
                | Self::SymlinkRejected { .. }
                | Self::PathTraversal { .. }
                | Self::VersionMismatch { .. }
        )
    }

    /// Exception class recorded on `ImportFailure` rows.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config { .. } => "ConfigError",
            Self::ArchiveInvalid { .. } => "ArchiveInvalid",
            Self::UnknownRelation { .. } => "UnknownRelationError",
            Self::TransientPersistence { .. } => "TransientPersistenceError",
            Self::Persistence { .. } => "PersistenceError",
            Self::Encoding { .. } => "EncodingError",
            Self::HardLink { .. } => "HardLinkError",
            Self::SymlinkRejected { .. } => "SymlinkRejected",
            Self::PathTraversal { .. } => "PathTraversal",
            Self::VersionMismatch { .. } => "VersionMismatch",
            Self::InvalidFormat { .. } => "InvalidFormat",
            Self::Io { .. } => "IoError",
            Self::Json { .. } => "JsonError",
            Self::Store { .. } => "StoreError",
        }
    }

    /// Message safe to hand to end users: absolute paths are replaced.
    pub fn user_message(&self) -> String {
        redact_paths(&self.to_string())
    }
}

impl From<std::io::Error> for ImportExportError {
    #[track_caller]
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<serde_json::Error> for ImportExportError {
    #[track_caller]
    fn from(source: serde_json::Error) -> Self {
        Self::Json {
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<StoreError> for ImportExportError {
    #[track_caller]
    fn from(source: StoreError) -> Self {
        let location = ErrorLocation::from(Location::caller());
        match source {
            StoreError::Transient { message, .. } => Self::TransientPersistence { message, location },
            StoreError::Rejected { message, .. } => Self::Persistence { message, location },
            StoreError::Encoding { id, message, .. } => Self::Encoding {
                message: format!("record {}: {}", id, message),
                location,
            },
            other => Self::Store {
                source: other,
                location,
            },
        }
    }
}

pub type Result<T> = StdResult<T, ImportExportError>;
