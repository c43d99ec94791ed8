use crate::store::Cardinality;
use crate::tree::{DeferredLink, MAX_TREE_DEPTH, RawRelationConfig, RawTreeNode, RelationNode};
use crate::{ImportExportError, Result};

use std::collections::{BTreeMap, BTreeSet};

pub const DEFAULT_PROJECT_TREE: &str = include_str!("../../resources/project_tree.yml");
pub const DEFAULT_GROUP_TREE: &str = include_str!("../../resources/group_tree.yml");

/// The validated, immutable relation tree plus its per-relation rules.
#[derive(Debug, Clone)]
pub struct RelationConfig {
    root: RelationNode,
    names: BTreeSet<String>,
    children_by_name: BTreeMap<String, BTreeSet<String>>,
    renames: BTreeMap<String, String>,
    existing_objects: BTreeMap<String, Vec<String>>,
    deferred_links: BTreeMap<String, Vec<DeferredLink>>,
    regenerate_tokens: BTreeMap<String, Vec<String>>,
    classes: BTreeMap<String, String>,
    members_relation: Option<String>,
}

impl RelationConfig {
    pub fn load(source: &str) -> Result<Self> {
        Self::build(RawRelationConfig::parse(source)?)
    }

    /// Load `base`, union `extension` into it, then validate the result.
    pub fn merge(base: &str, extension: &str) -> Result<Self> {
        let raw = RawRelationConfig::parse(base)?.merge(RawRelationConfig::parse(extension)?)?;
        Self::build(raw)
    }

    pub fn default_project() -> Result<Self> {
        Self::load(DEFAULT_PROJECT_TREE)
    }

    pub fn default_group() -> Result<Self> {
        Self::load(DEFAULT_GROUP_TREE)
    }

    pub fn build(raw: RawRelationConfig) -> Result<Self> {
        let Some(tree) = raw.tree.as_ref() else {
            return Err(ImportExportError::config("relation tree is empty"));
        };

        let mut names = BTreeSet::new();
        let mut children_by_name: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        check_finite(tree, &mut Vec::new(), &mut names, &mut children_by_name)?;

        let sections: [(&str, Vec<&String>); 8] = [
            ("included_attributes", raw.included_attributes.keys().collect()),
            ("excluded_attributes", raw.excluded_attributes.keys().collect()),
            ("methods", raw.methods.keys().collect()),
            ("preloads", raw.preloads.keys().collect()),
            ("existing_objects", raw.existing_objects.keys().collect()),
            ("deferred_links", raw.deferred_links.keys().collect()),
            ("regenerate_tokens", raw.regenerate_tokens.keys().collect()),
            ("classes", raw.classes.keys().collect()),
        ];
        for (section, relations) in sections {
            for relation in relations {
                if !names.contains(relation) {
                    return Err(ImportExportError::config(format!(
                        "{} references unknown relation '{}'",
                        section, relation
                    )));
                }
            }
        }

        for relation in &raw.has_one {
            if !names.contains(relation) {
                return Err(ImportExportError::config(format!(
                    "has_one references unknown relation '{}'",
                    relation
                )));
            }
        }

        for relation in raw.included_attributes.keys() {
            if raw.excluded_attributes.contains_key(relation) {
                return Err(ImportExportError::config(format!(
                    "relation '{}' declares both included and excluded attributes",
                    relation
                )));
            }
        }

        for (old, new) in &raw.renames {
            if !names.contains(new) {
                return Err(ImportExportError::config(format!(
                    "rename '{}' -> '{}' targets an unknown relation",
                    old, new
                )));
            }
            if names.contains(old) {
                return Err(ImportExportError::config(format!(
                    "rename source '{}' is still a relation in the tree",
                    old
                )));
            }
        }

        for (relation, preloaded) in &raw.preloads {
            let children = children_by_name.get(relation);
            for child in preloaded {
                if !children.is_some_and(|c| c.contains(child)) {
                    return Err(ImportExportError::config(format!(
                        "preload '{}' is not a child of '{}'",
                        child, relation
                    )));
                }
            }
        }

        for (relation, links) in &raw.deferred_links {
            let children = children_by_name.get(relation);
            for link in links {
                if !children.is_some_and(|c| c.contains(&link.relation)) {
                    return Err(ImportExportError::config(format!(
                        "deferred link '{}' on '{}' points at '{}', which is not a child",
                        link.attribute, relation, link.relation
                    )));
                }
            }
        }

        if let Some(members) = &raw.members_relation
            && tree.children.iter().all(|child| &child.name != members)
        {
            return Err(ImportExportError::config(format!(
                "members_relation '{}' is not a top-level relation",
                members
            )));
        }

        let root = build_node(tree, None, &raw);

        Ok(Self {
            root,
            names,
            children_by_name,
            renames: raw.renames,
            existing_objects: raw.existing_objects,
            deferred_links: raw.deferred_links,
            regenerate_tokens: raw.regenerate_tokens,
            classes: raw.classes,
            members_relation: raw.members_relation,
        })
    }

    pub fn root(&self) -> &RelationNode {
        &self.root
    }

    pub fn root_name(&self) -> &str {
        &self.root.name
    }

    pub fn relation_names(&self) -> &BTreeSet<String> {
        &self.names
    }

    /// Child relation names of `relation` across every place it appears.
    pub fn children_of(&self, relation: &str) -> Option<&BTreeSet<String>> {
        self.children_by_name.get(self.canonical_name(relation))
    }

    /// Current name for a possibly renamed relation.
    pub fn canonical_name<'a>(&'a self, name: &'a str) -> &'a str {
        self.renames.get(name).map(String::as_str).unwrap_or(name)
    }

    /// Old names that still have to be accepted when reading `relation`.
    pub fn aliases_for(&self, relation: &str) -> Vec<&str> {
        self.renames
            .iter()
            .filter(|(_, new)| new.as_str() == relation)
            .map(|(old, _)| old.as_str())
            .collect()
    }

    pub fn renames(&self) -> &BTreeMap<String, String> {
        &self.renames
    }

    pub fn is_known(&self, name: &str) -> bool {
        self.names.contains(self.canonical_name(name))
    }

    pub fn existing_object_keys(&self, relation: &str) -> Option<&[String]> {
        self.existing_objects.get(relation).map(Vec::as_slice)
    }

    pub fn deferred_links(&self, relation: &str) -> &[DeferredLink] {
        self.deferred_links
            .get(relation)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn regenerate_tokens(&self, relation: &str) -> &[String] {
        self.regenerate_tokens
            .get(relation)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn members_relation(&self) -> Option<&str> {
        self.members_relation.as_deref()
    }

    /// Class the store should instantiate for `relation`.
    pub fn target_class(&self, relation: &str) -> String {
        match self.classes.get(relation) {
            Some(class) => class.clone(),
            None => derive_class(relation),
        }
    }
}

fn check_finite<'a>(
    node: &'a RawTreeNode,
    ancestors: &mut Vec<&'a str>,
    names: &mut BTreeSet<String>,
    children_by_name: &mut BTreeMap<String, BTreeSet<String>>,
) -> Result<()> {
    if ancestors.contains(&node.name.as_str()) {
        return Err(ImportExportError::config(format!(
            "relation '{}' includes itself via {}",
            node.name,
            ancestors.join(" -> ")
        )));
    }
    if ancestors.len() >= MAX_TREE_DEPTH {
        return Err(ImportExportError::config(format!(
            "relation tree deeper than {} levels at '{}'",
            MAX_TREE_DEPTH, node.name
        )));
    }

    names.insert(node.name.clone());
    let children = children_by_name.entry(node.name.clone()).or_default();
    for (index, child) in node.children.iter().enumerate() {
        if node.children[..index].iter().any(|c| c.name == child.name) {
            return Err(ImportExportError::config(format!(
                "relation '{}' lists child '{}' twice",
                node.name, child.name
            )));
        }
        children.insert(child.name.clone());
    }

    ancestors.push(&node.name);
    for child in &node.children {
        check_finite(child, ancestors, names, children_by_name)?;
    }
    ancestors.pop();
    Ok(())
}

fn build_node(raw_node: &RawTreeNode, parent: Option<&str>, raw: &RawRelationConfig) -> RelationNode {
    let name = raw_node.name.as_str();
    let preload = parent
        .and_then(|p| raw.preloads.get(p))
        .is_some_and(|list| list.iter().any(|child| child == name));
    let cardinality = if raw.has_one.iter().any(|r| r == name) {
        Cardinality::One
    } else {
        Cardinality::Many
    };

    RelationNode {
        name: raw_node.name.clone(),
        include: raw_node
            .children
            .iter()
            .map(|child| build_node(child, Some(name), raw))
            .collect(),
        only: raw.included_attributes.get(name).cloned(),
        except: raw.excluded_attributes.get(name).cloned(),
        methods: raw.methods.get(name).cloned().unwrap_or_default(),
        preload,
        cardinality,
    }
}

/// `merge_request_diffs` -> `MergeRequestDiff`
fn derive_class(relation: &str) -> String {
    let singular = if let Some(stem) = relation.strip_suffix("ies") {
        format!("{}y", stem)
    } else if relation.ends_with("sses") || relation.ends_with("uses") || relation.ends_with("xes")
    {
        relation[..relation.len() - 2].to_string()
    } else if let Some(stem) = relation.strip_suffix('s') {
        stem.to_string()
    } else {
        relation.to_string()
    };

    singular
        .split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}
