pub mod error;
pub mod models;
pub mod permitter;
pub mod redact;
pub mod store;
pub mod tracking;
pub mod tree;

#[cfg(test)]
mod tests;

pub use error::{ImportExportError, Result};
pub use models::import_failure::ImportFailure;
pub use models::job_context::{ImportOptions, JobContext, TargetRoot};
pub use models::member_map::{ExportedUserId, MemberMap, Membership, PendingInvitation};
pub use models::progress_entry::ProgressEntry;
pub use models::record::{ParentLink, Record, RecordId};
pub use models::relation_counts::RelationCounts;
pub use models::relation_record::RelationRecord;
pub use models::user::{User, UserId};
pub use permitter::{AttributesPermitter, PermittedAttributes};
pub use redact::redact_paths;
pub use store::{Association, Cardinality, ObjectStore, StoreError, StoreResult, UserDirectory};
pub use tracking::{FailureLog, ProgressStore};
pub use tree::{DeferredLink, RelationConfig, RelationNode};

pub use error_location::ErrorLocation;
