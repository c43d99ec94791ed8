//! Export and import of record trees.
//!
//! `ExportService` walks a root through the relation tree and writes an
//! archive. `ImportService` runs an archive through the safety gate and
//! rebuilds the tree under an existing destination root.

pub mod document;
pub mod export_service;
pub mod import_service;
pub mod job_report;
pub mod member_mapper;
pub mod method_registry;
pub mod progress_tracker;
pub mod relation_factory;
pub mod restorer;
pub mod retry;
pub mod serializer;

#[cfg(test)]
mod tests;

pub use document::{DocumentReader, DocumentWriter, JsonWriter, NdjsonWriter, RelationEntries};
pub use export_service::ExportService;
pub use import_service::ImportService;
pub use job_report::JobReport;
pub use member_mapper::MemberMapper;
pub use method_registry::{MethodFn, MethodRegistry};
pub use progress_tracker::ProgressTracker;
pub use relation_factory::RelationFactory;
pub use restorer::{RestoreOutcome, TreeRestorer};
pub use retry::{IsRetryable, with_retry};
pub use serializer::{ExportCounts, TreeSerializer};
