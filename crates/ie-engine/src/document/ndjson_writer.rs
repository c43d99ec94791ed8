use crate::document::{DocumentWriter, ndjson_relation_path, ndjson_root_path};

use ie_core::{ImportExportError, Result};

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use serde_json::{Map, Value};

/// Root object in `tree/<root>.json`, one `.ndjson` file per has-many relation.
pub struct NdjsonWriter {
    dir: PathBuf,
    root: String,
    attributes: Map<String, Value>,
    files: HashMap<String, BufWriter<File>>,
}

impl NdjsonWriter {
    pub fn new(dir: PathBuf, root: &str) -> Self {
        Self {
            dir,
            root: root.to_string(),
            attributes: Map::new(),
            files: HashMap::new(),
        }
    }
}

impl DocumentWriter for NdjsonWriter {
    fn write_root(&mut self, attributes: Map<String, Value>) -> Result<()> {
        self.attributes = attributes;
        Ok(())
    }

    fn write_one(&mut self, relation: &str, value: Value) -> Result<()> {
        self.attributes.insert(relation.to_string(), value);
        Ok(())
    }

    fn start_many(&mut self, relation: &str) -> Result<()> {
        let path = ndjson_relation_path(&self.dir, &self.root, relation);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        self.files
            .insert(relation.to_string(), BufWriter::new(File::create(path)?));
        Ok(())
    }

    fn append_many(&mut self, relation: &str, entry: &Value) -> Result<()> {
        let Some(file) = self.files.get_mut(relation) else {
            return Err(ImportExportError::invalid_format(format!(
                "relation '{}' appended before it was started",
                relation
            )));
        };
        serde_json::to_writer(&mut *file, entry)?;
        file.write_all(b"\n")?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        for (_, mut file) in self.files.drain() {
            file.flush()?;
        }

        let path = ndjson_root_path(&self.dir, &self.root);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = BufWriter::new(File::create(path)?);
        serde_json::to_writer(&mut file, &self.attributes)?;
        file.flush()?;
        Ok(())
    }
}
