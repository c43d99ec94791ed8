pub mod import_failure;
pub mod job_context;
pub mod member_map;
pub mod progress_entry;
pub mod record;
pub mod relation_counts;
pub mod relation_record;
pub mod user;
