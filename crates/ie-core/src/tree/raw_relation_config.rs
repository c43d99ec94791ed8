use crate::tree::{DeferredLink, MAX_TREE_DEPTH};
use crate::{ImportExportError, Result};

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_yaml::Value;

/// Tree node as written in the YAML resource, before rules are attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTreeNode {
    pub name: String,
    pub children: Vec<RawTreeNode>,
}

impl RawTreeNode {
    fn leaf(name: String) -> Self {
        Self {
            name,
            children: Vec::new(),
        }
    }

    /// Tree union: children of `other` are merged by name, new ones appended.
    fn merge(&mut self, other: RawTreeNode) {
        for child in other.children {
            match self.children.iter_mut().find(|c| c.name == child.name) {
                Some(existing) => existing.merge(child),
                None => self.children.push(child),
            }
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawDocument {
    tree: Value,
    included_attributes: BTreeMap<String, Vec<String>>,
    excluded_attributes: BTreeMap<String, Vec<String>>,
    methods: BTreeMap<String, Vec<String>>,
    preloads: BTreeMap<String, Vec<String>>,
    has_one: Vec<String>,
    renames: BTreeMap<String, String>,
    existing_objects: BTreeMap<String, Vec<String>>,
    deferred_links: BTreeMap<String, Vec<DeferredLink>>,
    regenerate_tokens: BTreeMap<String, Vec<String>>,
    classes: BTreeMap<String, String>,
    members_relation: Option<String>,
}

/// One parsed config source. Several sources merge before the tree is built.
#[derive(Debug, Clone, Default)]
pub struct RawRelationConfig {
    pub tree: Option<RawTreeNode>,
    pub included_attributes: BTreeMap<String, Vec<String>>,
    pub excluded_attributes: BTreeMap<String, Vec<String>>,
    pub methods: BTreeMap<String, Vec<String>>,
    pub preloads: BTreeMap<String, Vec<String>>,
    pub has_one: Vec<String>,
    pub renames: BTreeMap<String, String>,
    pub existing_objects: BTreeMap<String, Vec<String>>,
    pub deferred_links: BTreeMap<String, Vec<DeferredLink>>,
    pub regenerate_tokens: BTreeMap<String, Vec<String>>,
    pub classes: BTreeMap<String, String>,
    pub members_relation: Option<String>,
}

impl RawRelationConfig {
    pub fn parse(source: &str) -> Result<Self> {
        let doc: RawDocument = serde_yaml::from_str(source)
            .map_err(|e| ImportExportError::config(format!("malformed relation config: {}", e)))?;

        let tree = match &doc.tree {
            Value::Null => None,
            Value::Mapping(mapping) => {
                if mapping.len() != 1 {
                    return Err(ImportExportError::config(format!(
                        "tree must have exactly one root relation, found {}",
                        mapping.len()
                    )));
                }
                let Some((key, children)) = mapping.iter().next() else {
                    return Err(ImportExportError::config("tree has no root relation"));
                };
                let name = relation_name(key)?;
                Some(RawTreeNode {
                    name,
                    children: parse_children(children, 1)?,
                })
            }
            other => {
                return Err(ImportExportError::config(format!(
                    "tree must be a mapping, found {}",
                    describe(other)
                )));
            }
        };

        Ok(Self {
            tree,
            included_attributes: doc.included_attributes,
            excluded_attributes: doc.excluded_attributes,
            methods: doc.methods,
            preloads: doc.preloads,
            has_one: doc.has_one,
            renames: doc.renames,
            existing_objects: doc.existing_objects,
            deferred_links: doc.deferred_links,
            regenerate_tokens: doc.regenerate_tokens,
            classes: doc.classes,
            members_relation: doc.members_relation,
        })
    }

    /// Union of two sources. `extension` wins on single-valued keys.
    pub fn merge(mut self, extension: RawRelationConfig) -> Result<Self> {
        self.tree = match (self.tree.take(), extension.tree) {
            (Some(mut base), Some(ext)) => {
                if base.name != ext.name {
                    return Err(ImportExportError::config(format!(
                        "cannot merge tree rooted at '{}' into tree rooted at '{}'",
                        ext.name, base.name
                    )));
                }
                base.merge(ext);
                Some(base)
            }
            (base, ext) => base.or(ext),
        };

        union_lists(&mut self.included_attributes, extension.included_attributes);
        union_lists(&mut self.excluded_attributes, extension.excluded_attributes);
        union_lists(&mut self.methods, extension.methods);
        union_lists(&mut self.preloads, extension.preloads);
        union_lists(&mut self.existing_objects, extension.existing_objects);
        union_lists(&mut self.regenerate_tokens, extension.regenerate_tokens);
        union_vec(&mut self.has_one, extension.has_one);

        for (relation, links) in extension.deferred_links {
            let entry = self.deferred_links.entry(relation).or_default();
            for link in links {
                if !entry.contains(&link) {
                    entry.push(link);
                }
            }
        }

        self.renames.extend(extension.renames);
        self.classes.extend(extension.classes);
        if extension.members_relation.is_some() {
            self.members_relation = extension.members_relation;
        }

        Ok(self)
    }
}

fn parse_children(value: &Value, depth: usize) -> Result<Vec<RawTreeNode>> {
    if depth >= MAX_TREE_DEPTH {
        return Err(ImportExportError::config(format!(
            "relation tree deeper than {} levels",
            MAX_TREE_DEPTH
        )));
    }

    let items = match value {
        Value::Null => return Ok(Vec::new()),
        Value::Sequence(items) => items,
        other => {
            return Err(ImportExportError::config(format!(
                "relation children must be a list, found {}",
                describe(other)
            )));
        }
    };

    let mut nodes = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Value::String(name) => nodes.push(RawTreeNode::leaf(name.clone())),
            Value::Mapping(mapping) if mapping.len() == 1 => {
                for (key, children) in mapping {
                    nodes.push(RawTreeNode {
                        name: relation_name(key)?,
                        children: parse_children(children, depth + 1)?,
                    });
                }
            }
            other => {
                return Err(ImportExportError::config(format!(
                    "relation entry must be a name or a single-key mapping, found {}",
                    describe(other)
                )));
            }
        }
    }
    Ok(nodes)
}

fn relation_name(key: &Value) -> Result<String> {
    match key {
        Value::String(name) if !name.is_empty() => Ok(name.clone()),
        other => Err(ImportExportError::config(format!(
            "relation name must be a non-empty string, found {}",
            describe(other)
        ))),
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a list",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

fn union_vec(base: &mut Vec<String>, extra: Vec<String>) {
    for item in extra {
        if !base.contains(&item) {
            base.push(item);
        }
    }
}

fn union_lists(base: &mut BTreeMap<String, Vec<String>>, extra: BTreeMap<String, Vec<String>>) {
    for (relation, items) in extra {
        union_vec(base.entry(relation).or_default(), items);
    }
}
