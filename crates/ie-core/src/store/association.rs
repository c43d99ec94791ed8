use crate::Record;

use serde::{Deserialize, Serialize};

/// Whether a relation yields a collection or at most one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    #[default]
    Many,
    One,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Association {
    Many(Vec<Record>),
    One(Option<Record>),
}

impl Association {
    pub fn into_records(self) -> Vec<Record> {
        match self {
            Association::Many(records) => records,
            Association::One(record) => record.into_iter().collect(),
        }
    }
}
