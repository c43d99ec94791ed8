use crate::store::Cardinality;

/// One relation in the portable tree.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationNode {
    pub name: String,
    pub include: Vec<RelationNode>,
    pub only: Option<Vec<String>>,
    pub except: Option<Vec<String>>,
    pub methods: Vec<String>,
    /// Parent asked the store to preload this relation
    pub preload: bool,
    pub cardinality: Cardinality,
}

impl RelationNode {
    pub fn child(&self, name: &str) -> Option<&RelationNode> {
        self.include.iter().find(|node| node.name == name)
    }

    pub fn is_leaf(&self) -> bool {
        self.include.is_empty()
    }

    /// Names of the children the parent should preload.
    pub fn preloaded_children(&self) -> Vec<String> {
        self.include
            .iter()
            .filter(|node| node.preload)
            .map(|node| node.name.clone())
            .collect()
    }

    /// Depth of the subtree rooted here, counting this node.
    pub fn depth(&self) -> usize {
        1 + self.include.iter().map(RelationNode::depth).max().unwrap_or(0)
    }

    /// Pre-order walk with an explicit stack.
    pub fn walk(&self) -> Vec<&RelationNode> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(node.include.iter().rev());
        }
        out
    }
}
