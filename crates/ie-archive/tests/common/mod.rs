#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::write::GzEncoder;
use tar::{Builder, EntryType, Header};

/// Writes crafted `.tar.gz` files entry by entry.
pub struct CraftedArchive {
    builder: Builder<GzEncoder<File>>,
    path: PathBuf,
}

impl CraftedArchive {
    pub fn create(path: &Path) -> Self {
        let file = File::create(path).expect("Failed to create archive file");
        Self {
            builder: Builder::new(GzEncoder::new(file, Compression::default())),
            path: path.to_path_buf(),
        }
    }

    pub fn file(mut self, name: &str, data: &[u8]) -> Self {
        let mut header = Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_entry_type(EntryType::Regular);
        self.builder
            .append_data(&mut header, name, data)
            .expect("Failed to append file");
        self
    }

    pub fn symlink(mut self, name: &str, target: &str) -> Self {
        let mut header = Header::new_gnu();
        header.set_size(0);
        header.set_mode(0o777);
        header.set_entry_type(EntryType::Symlink);
        self.builder
            .append_link(&mut header, name, target)
            .expect("Failed to append symlink");
        self
    }

    pub fn hard_link(mut self, name: &str, target: &str) -> Self {
        let mut header = Header::new_gnu();
        header.set_size(0);
        header.set_mode(0o644);
        header.set_entry_type(EntryType::Link);
        self.builder
            .append_link(&mut header, name, target)
            .expect("Failed to append hard link");
        self
    }

    pub fn fifo(mut self, name: &str) -> Self {
        let mut header = Header::new_gnu();
        header.set_size(0);
        header.set_mode(0o644);
        header.set_entry_type(EntryType::Fifo);
        self.builder
            .append_data(&mut header, name, std::io::empty())
            .expect("Failed to append fifo");
        self
    }

    /// Raw name bytes, bypassing the builder's own `..` guard.
    pub fn raw_file(mut self, raw_name: &str, data: &[u8]) -> Self {
        let mut header = Header::new_old();
        {
            let name = &mut header.as_old_mut().name;
            name[..raw_name.len()].copy_from_slice(raw_name.as_bytes());
        }
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_entry_type(EntryType::Regular);
        header.set_cksum();
        self.builder
            .append(&header, data)
            .expect("Failed to append raw entry");
        self
    }

    pub fn finish(self) -> PathBuf {
        let encoder = self.builder.into_inner().expect("Failed to finish tar");
        let mut file = encoder.finish().expect("Failed to finish gzip");
        file.flush().expect("Failed to flush archive");
        self.path
    }
}
