use crate::document::{TREE_DIR, legacy_path, ndjson_relation_path, ndjson_root_path};

use ie_core::{ImportExportError, Result};

use std::fs::{self, File};
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};

use log::info;
use serde_json::{Map, Value};

/// Entries of one relation, pulled lazily for NDJSON files.
pub enum RelationEntries {
    Lines(Lines<BufReader<File>>),
    Inline(std::vec::IntoIter<Value>),
}

impl Iterator for RelationEntries {
    type Item = Result<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Self::Lines(lines) => loop {
                let line = match lines.next()? {
                    Ok(line) => line,
                    Err(e) => return Some(Err(e.into())),
                };
                if line.trim().is_empty() {
                    continue;
                }
                return Some(serde_json::from_str(&line).map_err(ImportExportError::from));
            },
            Self::Inline(values) => values.next().map(Ok),
        }
    }
}

/// An extracted export, in either layout.
pub struct DocumentReader {
    root: Map<String, Value>,
    ndjson_dir: Option<PathBuf>,
    root_name: String,
}

impl DocumentReader {
    /// Prefers the NDJSON layout, falls back to the legacy `<root>.json`.
    pub fn open(dir: &Path, root_name: &str) -> Result<Self> {
        let ndjson_root = ndjson_root_path(dir, root_name);
        if ndjson_root.is_file() {
            info!("Reading NDJSON export for '{}'", root_name);
            return Ok(Self {
                root: read_object(&ndjson_root)?,
                ndjson_dir: Some(dir.to_path_buf()),
                root_name: root_name.to_string(),
            });
        }

        let legacy = legacy_path(dir, root_name);
        if legacy.is_file() {
            info!("Reading legacy JSON export for '{}'", root_name);
            return Ok(Self {
                root: read_object(&legacy)?,
                ndjson_dir: None,
                root_name: root_name.to_string(),
            });
        }

        Err(ImportExportError::invalid_format(format!(
            "no '{}' document found in archive",
            root_name
        )))
    }

    pub fn is_ndjson(&self) -> bool {
        self.ndjson_dir.is_some()
    }

    /// The root object including any inline relations.
    pub fn root(&self) -> &Map<String, Value> {
        &self.root
    }

    /// Relations stored in side files, by file stem.
    pub fn batched_relations(&self) -> Result<Vec<String>> {
        let Some(dir) = &self.ndjson_dir else {
            return Ok(Vec::new());
        };
        let relation_dir = dir.join(TREE_DIR).join(&self.root_name);
        if !relation_dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(relation_dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "ndjson")
                && let Some(stem) = path.file_stem()
            {
                names.push(stem.to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Entries for `relation`, None when the document does not carry it.
    pub fn relation(&self, relation: &str) -> Result<Option<RelationEntries>> {
        if let Some(dir) = &self.ndjson_dir {
            let path = ndjson_relation_path(dir, &self.root_name, relation);
            if path.is_file() {
                let lines = BufReader::new(File::open(path)?).lines();
                return Ok(Some(RelationEntries::Lines(lines)));
            }
        }

        Ok(match self.root.get(relation) {
            Some(Value::Array(items)) => Some(RelationEntries::Inline(items.clone().into_iter())),
            Some(value @ Value::Object(_)) => {
                Some(RelationEntries::Inline(vec![value.clone()].into_iter()))
            }
            _ => None,
        })
    }
}

fn read_object(path: &Path) -> Result<Map<String, Value>> {
    let file = BufReader::new(File::open(path)?);
    match serde_json::from_reader(file)? {
        Value::Object(map) => Ok(map),
        _ => Err(ImportExportError::invalid_format(
            "root document is not a JSON object",
        )),
    }
}
