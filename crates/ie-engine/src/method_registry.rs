use ie_core::{ImportExportError, Record, RelationConfig, Result};

use std::collections::HashMap;

use serde_json::Value;

/// A computed pseudo-attribute: pure function of the record.
pub type MethodFn = fn(&Record) -> Value;

/// `(relation, method) -> fn` table evaluated during serialization.
#[derive(Clone, Default)]
pub struct MethodRegistry {
    methods: HashMap<(String, String), MethodFn>,
}

impl MethodRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The methods the bundled relation trees declare.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("labels", "type", label_type);
        registry.register("label", "type", label_type);
        registry.register("merge_request_diff", "utf8_st_diffs", utf8_st_diffs);
        registry.register("merge_request_diff_files", "utf8_diff", utf8_diff);
        registry
    }

    pub fn register(&mut self, relation: &str, method: &str, f: MethodFn) {
        self.methods
            .insert((relation.to_string(), method.to_string()), f);
    }

    pub fn get(&self, relation: &str, method: &str) -> Option<MethodFn> {
        self.methods
            .get(&(relation.to_string(), method.to_string()))
            .copied()
    }

    /// Every method the tree declares must have an implementation.
    pub fn validate(&self, config: &RelationConfig) -> Result<()> {
        for node in config.root().walk() {
            for method in &node.methods {
                if self.get(&node.name, method).is_none() {
                    return Err(ImportExportError::config(format!(
                        "method '{}' declared for relation '{}' has no implementation",
                        method, node.name
                    )));
                }
            }
        }
        Ok(())
    }
}

fn label_type(record: &Record) -> Value {
    Value::String(
        record
            .attribute_str("type")
            .unwrap_or(record.class.as_str())
            .to_string(),
    )
}

fn utf8_st_diffs(record: &Record) -> Value {
    utf8(record.attributes.get("st_diffs"))
}

fn utf8_diff(record: &Record) -> Value {
    utf8(record.attributes.get("diff"))
}

/// Text kept as is; byte arrays decoded lossily.
fn utf8(value: Option<&Value>) -> Value {
    match value {
        Some(Value::String(text)) => Value::String(text.clone()),
        Some(Value::Array(items)) => {
            let bytes: Vec<u8> = items
                .iter()
                .filter_map(Value::as_u64)
                .filter_map(|b| u8::try_from(b).ok())
                .collect();
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        }
        Some(other) => other.clone(),
        None => Value::Null,
    }
}
