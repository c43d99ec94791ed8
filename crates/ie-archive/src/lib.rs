pub mod file_importer;
pub mod gate;
pub mod path_validator;
pub mod saver;
pub mod size_validator;
pub mod state;
pub mod version_checker;


pub use file_importer::FileImporter;
pub use gate::{ArchiveGate, TrustedArchive};
pub use path_validator::PathValidator;
pub use saver::ArchiveSaver;
pub use size_validator::DecompressedSizeValidator;
pub use state::ArchiveState;
pub use version_checker::{VERSION, VERSION_FILE, VersionChecker};
