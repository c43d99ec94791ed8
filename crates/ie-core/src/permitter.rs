use crate::tree::{RelationConfig, RelationNode};

use std::collections::{BTreeMap, BTreeSet};

use serde_json::{Map, Value};

/// The attribute surface of one relation, shared by export and import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermittedAttributes {
    only: Option<BTreeSet<String>>,
    except: BTreeSet<String>,
    methods: BTreeSet<String>,
    children: BTreeSet<String>,
}

impl PermittedAttributes {
    /// Allow-listed attributes (`only ∪ methods`), None for deny-list relations.
    pub fn allowed(&self) -> Option<&BTreeSet<String>> {
        self.only.as_ref()
    }

    pub fn excluded(&self) -> &BTreeSet<String> {
        &self.except
    }

    pub fn methods(&self) -> &BTreeSet<String> {
        &self.methods
    }

    pub fn is_child(&self, key: &str) -> bool {
        self.children.contains(key)
    }

    /// Whether `key` is named by the allow-list or the methods.
    pub fn names_explicitly(&self, key: &str) -> bool {
        self.methods.contains(key) || self.only.as_ref().is_some_and(|only| only.contains(key))
    }

    /// Child relation keys are never attributes. Objects and arrays under
    /// any other key follow the same allow- or deny-list as scalars.
    pub fn permits(&self, key: &str) -> bool {
        if self.children.contains(key) {
            return false;
        }
        match &self.only {
            Some(only) => only.contains(key),
            None => !self.except.contains(key),
        }
    }
}

pub fn is_structured(value: &Value) -> bool {
    matches!(value, Value::Array(_) | Value::Object(_))
}

/// Permitted attribute sets for every relation, computed once per job.
#[derive(Debug, Clone)]
pub struct AttributesPermitter {
    permitted: BTreeMap<String, PermittedAttributes>,
    aliases: BTreeMap<String, String>,
}

impl AttributesPermitter {
    pub fn new(config: &RelationConfig) -> Self {
        let mut permitted: BTreeMap<String, PermittedAttributes> = BTreeMap::new();

        for node in config.root().walk() {
            let entry = permitted
                .entry(node.name.clone())
                .or_insert_with(|| empty_for(node));
            entry
                .children
                .extend(node.include.iter().map(|child| child.name.clone()));
        }

        Self {
            permitted,
            aliases: config.renames().clone(),
        }
    }

    fn resolve<'a>(&'a self, relation: &'a str) -> &'a str {
        self.aliases
            .get(relation)
            .map(String::as_str)
            .unwrap_or(relation)
    }

    pub fn permitted_attributes_for(&self, relation: &str) -> Option<&PermittedAttributes> {
        self.permitted.get(self.resolve(relation))
    }

    /// True for relations in the tree and for their old, renamed names.
    pub fn permitted_attributes_defined(&self, relation: &str) -> bool {
        self.permitted.contains_key(self.resolve(relation))
    }

    /// Drop every attribute `relation` does not permit. Never fails.
    ///
    /// A structured value under the name of a relation found elsewhere in
    /// the tree is dropped too, unless `relation` names it explicitly.
    pub fn permit(&self, relation: &str, raw: &Map<String, Value>) -> Map<String, Value> {
        let Some(permitted) = self.permitted_attributes_for(relation) else {
            return Map::new();
        };

        raw.iter()
            .filter(|(key, _)| permitted.permits(key))
            .filter(|(key, value)| {
                !is_structured(value)
                    || permitted.names_explicitly(key)
                    || !self.permitted_attributes_defined(key)
            })
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }
}

fn empty_for(node: &RelationNode) -> PermittedAttributes {
    let methods: BTreeSet<String> = node.methods.iter().cloned().collect();
    let only = node.only.as_ref().map(|only| {
        only.iter()
            .cloned()
            .chain(methods.iter().cloned())
            .collect::<BTreeSet<String>>()
    });

    PermittedAttributes {
        only,
        except: node
            .except
            .as_ref()
            .map(|except| except.iter().cloned().collect())
            .unwrap_or_default(),
        methods,
        children: BTreeSet::new(),
    }
}
