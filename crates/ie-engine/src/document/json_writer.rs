use crate::document::{DocumentWriter, legacy_path};

use ie_core::{ImportExportError, Result};

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use serde_json::{Map, Value};

/// Legacy single-document `<root>.json`. Holds the whole tree in memory.
pub struct JsonWriter {
    dir: PathBuf,
    root: String,
    document: Map<String, Value>,
}

impl JsonWriter {
    pub fn new(dir: PathBuf, root: &str) -> Self {
        Self {
            dir,
            root: root.to_string(),
            document: Map::new(),
        }
    }
}

impl DocumentWriter for JsonWriter {
    fn write_root(&mut self, attributes: Map<String, Value>) -> Result<()> {
        self.document = attributes;
        Ok(())
    }

    fn write_one(&mut self, relation: &str, value: Value) -> Result<()> {
        self.document.insert(relation.to_string(), value);
        Ok(())
    }

    fn start_many(&mut self, relation: &str) -> Result<()> {
        self.document
            .insert(relation.to_string(), Value::Array(Vec::new()));
        Ok(())
    }

    fn append_many(&mut self, relation: &str, entry: &Value) -> Result<()> {
        match self.document.get_mut(relation) {
            Some(Value::Array(entries)) => {
                entries.push(entry.clone());
                Ok(())
            }
            _ => Err(ImportExportError::invalid_format(format!(
                "relation '{}' appended before it was started",
                relation
            ))),
        }
    }

    fn finish(&mut self) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let mut file = BufWriter::new(File::create(legacy_path(&self.dir, &self.root))?);
        serde_json::to_writer(&mut file, &self.document)?;
        file.flush()?;
        Ok(())
    }
}
