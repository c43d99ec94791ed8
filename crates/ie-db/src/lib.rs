pub mod connection;
pub mod error;
pub mod repositories;

pub use connection::{open_pool, run_migrations};
pub use error::{DbError, Result};
pub use repositories::import_failure_repository::ImportFailureRepository;
pub use repositories::progress_entry_repository::ProgressEntryRepository;
pub use repositories::record_repository::SqliteObjectStore;
pub use repositories::user_repository::UserRepository;
