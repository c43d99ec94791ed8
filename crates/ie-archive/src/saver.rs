use crate::version_checker::{VERSION, VERSION_FILE};

use ie_core::{ImportExportError, Result};

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use chrono::Utc;
use flate2::Compression;
use flate2::write::GzEncoder;
use log::info;
use walkdir::WalkDir;

/// Bundles an export directory into `<timestamp>_<name>_export.tar.gz`.
pub struct ArchiveSaver {
    export_dir: PathBuf,
}

impl ArchiveSaver {
    pub fn new(export_dir: &Path) -> Self {
        Self {
            export_dir: export_dir.to_path_buf(),
        }
    }

    pub fn archive_file_name(name: &str) -> String {
        format!(
            "{}_{}_export.tar.gz",
            Utc::now().format("%Y-%m-%d_%H-%M-%3f"),
            sanitize(name)
        )
    }

    pub fn write_version(&self) -> Result<()> {
        fs::create_dir_all(&self.export_dir)?;
        fs::write(self.export_dir.join(VERSION_FILE), VERSION)?;
        Ok(())
    }

    /// Write `VERSION`, then archive the export directory into `destination`.
    pub fn save(&self, name: &str, destination: &Path) -> Result<PathBuf> {
        self.write_version()?;
        fs::create_dir_all(destination)?;

        let archive_path = destination.join(Self::archive_file_name(name));
        let file = File::create(&archive_path)?;
        let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
        builder.follow_symlinks(false);

        let walker = WalkDir::new(&self.export_dir)
            .follow_links(false)
            .sort_by_file_name()
            .min_depth(1);
        for entry in walker {
            let entry = entry.map_err(|e| ImportExportError::archive_invalid(e.to_string()))?;
            let relative = entry
                .path()
                .strip_prefix(&self.export_dir)
                .map_err(|e| ImportExportError::archive_invalid(e.to_string()))?;
            if entry.file_type().is_dir() {
                builder.append_dir(relative, entry.path())?;
            } else if entry.file_type().is_file() {
                builder.append_path_with_name(entry.path(), relative)?;
            }
        }

        builder.into_inner()?.finish()?;
        info!("Export archive written ({})", archive_path.display());
        Ok(archive_path)
    }
}

fn sanitize(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '.' => c,
            _ => '_',
        })
        .collect();
    match cleaned.trim_matches('.') {
        "" => "export".to_string(),
        trimmed => trimmed.to_string(),
    }
}
