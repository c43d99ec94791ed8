pub mod import_failure_repository;
pub mod progress_entry_repository;
pub mod record_repository;
pub mod user_repository;
