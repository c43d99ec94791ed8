mod json_writer;
mod ndjson_writer;
mod reader;

pub use json_writer::JsonWriter;
pub use ndjson_writer::NdjsonWriter;
pub use reader::{DocumentReader, RelationEntries};

use ie_core::Result;

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

/// Directory holding the NDJSON layout inside an export.
pub const TREE_DIR: &str = "tree";

/// `tree/<root>.json`
pub fn ndjson_root_path(dir: &Path, root: &str) -> PathBuf {
    dir.join(TREE_DIR).join(format!("{}.json", root))
}

/// `tree/<root>/<relation>.ndjson`
pub fn ndjson_relation_path(dir: &Path, root: &str, relation: &str) -> PathBuf {
    dir.join(TREE_DIR)
        .join(root)
        .join(format!("{}.ndjson", relation))
}

/// `<root>.json`, everything inline
pub fn legacy_path(dir: &Path, root: &str) -> PathBuf {
    dir.join(format!("{}.json", root))
}

/// Sink for one serialized root.
///
/// Callers write the root attributes first, then every top-level relation
/// in tree order, then `finish`.
pub trait DocumentWriter: Send {
    fn write_root(&mut self, attributes: Map<String, Value>) -> Result<()>;

    /// A has-one relation; `Value::Null` when empty.
    fn write_one(&mut self, relation: &str, value: Value) -> Result<()>;

    /// Open a has-many relation so it is present even without entries.
    fn start_many(&mut self, relation: &str) -> Result<()>;

    fn append_many(&mut self, relation: &str, entry: &Value) -> Result<()>;

    fn finish(&mut self) -> Result<()>;
}
