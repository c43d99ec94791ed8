mod deferred_link;
mod raw_relation_config;
mod relation_config;
mod relation_node;

pub use deferred_link::DeferredLink;
pub use raw_relation_config::{RawRelationConfig, RawTreeNode};
pub use relation_config::{DEFAULT_GROUP_TREE, DEFAULT_PROJECT_TREE, RelationConfig};
pub use relation_node::RelationNode;

/// Deepest nesting accepted for a relation tree.
pub const MAX_TREE_DEPTH: usize = 16;
