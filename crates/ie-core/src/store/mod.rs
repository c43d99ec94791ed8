mod association;
mod object_store;
mod store_error;
mod user_directory;

pub use association::{Association, Cardinality};
pub use object_store::ObjectStore;
pub use store_error::{StoreError, StoreResult};
pub use user_directory::UserDirectory;
