//! Document queries: by attribute, generic predicate matching.

use super::node::{NodeData, NodeId};
use super::tree::Document;

impl Document {
    /// Find all nodes carrying `name="value"`, in arena order.
    ///
    /// Detached nodes are included.
    pub fn query_by_attribute(&self, name: &str, value: &str) -> Vec<NodeId> {
        self.query_all(|data| data.attr(name) == Some(value))
    }

    /// Find all nodes matching an arbitrary predicate.
    pub fn query_all(&self, predicate: impl Fn(&NodeData) -> bool) -> Vec<NodeId> {
        self.iter_nodes()
            .filter(|(_, data)| predicate(data))
            .map(|(node_id, _)| node_id)
            .collect()
    }

    /// Iterate over all `(NodeId, &NodeData)` pairs in the arena.
    fn iter_nodes(&self) -> impl Iterator<Item = (NodeId, &NodeData)> {
        self.nodes.iter()
    }
}
