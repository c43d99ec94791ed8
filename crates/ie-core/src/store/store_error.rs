use crate::RecordId;

use std::panic::Location;
use std::result::Result as StdResult;

use error_location::ErrorLocation;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    /// Lock contention, busy database, dropped connection
    #[error("Transient store failure: {message} {location}")]
    Transient {
        message: String,
        location: ErrorLocation,
    },

    /// The store refused the record (validation, constraint)
    #[error("Record rejected: {message} {location}")]
    Rejected {
        message: String,
        location: ErrorLocation,
    },

    #[error("Record {id} cannot be encoded: {message} {location}")]
    Encoding {
        id: RecordId,
        message: String,
        location: ErrorLocation,
    },

    #[error("{class} {id} not found {location}")]
    NotFound {
        class: String,
        id: RecordId,
        location: ErrorLocation,
    },

    #[error("Store backend error: {message} {location}")]
    Backend {
        message: String,
        location: ErrorLocation,
    },
}

impl StoreError {
    #[track_caller]
    pub fn transient<S: Into<String>>(message: S) -> Self {
        Self::Transient {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn rejected<S: Into<String>>(message: S) -> Self {
        Self::Rejected {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn encoding<S: Into<String>>(id: RecordId, message: S) -> Self {
        Self::Encoding {
            id,
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn not_found<S: Into<String>>(class: S, id: RecordId) -> Self {
        Self::NotFound {
            class: class.into(),
            id,
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn backend<S: Into<String>>(message: S) -> Self {
        Self::Backend {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

pub type StoreResult<T> = StdResult<T, StoreError>;
