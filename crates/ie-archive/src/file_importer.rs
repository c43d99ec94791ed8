use ie_core::{ImportExportError, Result};

use std::fs::{self, File};
use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;
use log::{debug, warn};
use tar::{Archive, EntryType};
use walkdir::WalkDir;

/// Unpacks a `.tar.gz` export into a fresh directory.
///
/// Link entries and paths leaving the directory abort the extraction and
/// the partially extracted directory is removed. Pipes and device nodes
/// are never created.
#[derive(Debug, Default)]
pub struct FileImporter;

impl FileImporter {
    pub fn new() -> Self {
        Self
    }

    pub fn extract(&self, archive: &Path, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)?;

        let result = unpack(archive, dir).and_then(|()| remove_special_files(dir));
        if let Err(e) = &result {
            warn!("Extraction rejected ({}), removing extracted files", e.kind());
            if let Err(cleanup) = fs::remove_dir_all(dir) {
                warn!("Failed to remove extracted directory: {}", cleanup);
            }
        }
        result
    }
}

fn unpack(archive: &Path, dir: &Path) -> Result<()> {
    let file = File::open(archive)?;
    let mut tar = Archive::new(GzDecoder::new(file));

    for entry in tar.entries()? {
        let mut entry = entry?;
        let path = entry.path()?.into_owned();
        let kind = entry.header().entry_type();

        if kind.is_symlink() {
            return Err(ImportExportError::symlink_rejected(&path));
        }
        if kind.is_hard_link() {
            return Err(ImportExportError::hard_link(&path));
        }
        if kind.is_fifo() || kind.is_character_special() || kind.is_block_special() {
            warn!("Skipping special file entry {:?}", kind);
            continue;
        }

        let relative = contained_path(&path)?;
        if relative.as_os_str().is_empty() {
            continue;
        }
        let target = dir.join(&relative);

        match kind {
            EntryType::Directory => fs::create_dir_all(&target)?,
            EntryType::Regular | EntryType::Continuous => {
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent)?;
                }
                entry.unpack(&target)?;
            }
            other => debug!("Ignoring archive entry of type {:?}", other),
        }
    }

    Ok(())
}

/// Lexically normalise an entry path, rejecting anything that leaves the root.
fn contained_path(path: &Path) -> Result<PathBuf> {
    let mut normalised = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => normalised.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalised.pop() {
                    return Err(ImportExportError::path_traversal(path));
                }
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(ImportExportError::path_traversal(path));
            }
        }
    }
    Ok(normalised)
}

/// Delete everything under `dir` that is neither a regular file nor a directory.
fn remove_special_files(dir: &Path) -> Result<()> {
    for entry in WalkDir::new(dir).follow_links(false) {
        let entry = entry.map_err(|e| ImportExportError::archive_invalid(e.to_string()))?;
        let file_type = entry.file_type();
        if file_type.is_file() || file_type.is_dir() {
            continue;
        }
        warn!("Removing non-regular file from extracted archive");
        fs::remove_file(entry.path())?;
    }
    Ok(())
}
