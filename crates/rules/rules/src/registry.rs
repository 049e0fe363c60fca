use std::fmt;

use crate::error::ConstructionError;
use crate::node::NodeRef;
use crate::nodes;

/// Nodes available to rules, keyed by node id, in registration order.
#[derive(Clone, Default)]
pub struct NodeRegistry {
    nodes: Vec<NodeRef>,
}

impl NodeRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in node.
    pub fn with_builtins() -> Self {
        Self {
            nodes: nodes::builtins(),
        }
    }

    /// Register a node. Node ids must be unique.
    pub fn register(&mut self, node: NodeRef) -> Result<(), ConstructionError> {
        if self.get(node.id()).is_some() {
            return Err(ConstructionError::DuplicateNode(node.id().to_owned()));
        }
        self.nodes.push(node);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&NodeRef> {
        self.nodes.iter().find(|n| n.id() == id)
    }

    pub fn nodes(&self) -> &[NodeRef] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl fmt::Debug for NodeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.nodes.iter().map(|n| n.id()))
            .finish()
    }
}
