//! DOM queries: by id, tag, locator; generic predicate matching.

use super::node::{NodeData, NodeId};
use super::selector::Selector;
use super::tree::Dom;

impl Dom {
    /// Find the first node whose `id` field matches the given string.
    ///
    /// Iterates all nodes in the arena (not just the tree rooted at `root`).
    pub fn query_by_id(&self, id: &str) -> Option<NodeId> {
        self.iter_nodes()
            .find(|(_, data)| data.id.as_deref() == Some(id))
            .map(|(node_id, _)| node_id)
    }

    /// Find all nodes matching an arbitrary predicate.
    pub fn query_all(&self, predicate: impl Fn(&NodeData) -> bool) -> Vec<NodeId> {
        self.iter_nodes()
            .filter(|(_, data)| predicate(data))
            .map(|(node_id, _)| node_id)
            .collect()
    }

    /// First node in tree order under `start` (inclusive) matching `selector`.
    ///
    /// With `pierce`, isolated scopes are searched too and ancestor checks
    /// cross scope boundaries.
    pub fn query_selector(&self, start: NodeId, selector: &Selector, pierce: bool) -> Option<NodeId> {
        self.walk_for(start, pierce)
            .into_iter()
            .find(|&node| selector.matches(self, node, pierce))
    }

    /// Every node in tree order under `start` (inclusive) matching `selector`.
    pub fn query_selector_all(&self, start: NodeId, selector: &Selector, pierce: bool) -> Vec<NodeId> {
        self.walk_for(start, pierce)
            .into_iter()
            .filter(|&node| selector.matches(self, node, pierce))
            .collect()
    }

    fn walk_for(&self, start: NodeId, pierce: bool) -> Vec<NodeId> {
        if pierce {
            self.walk_composed(start)
        } else {
            self.walk_depth_first(start)
        }
    }

    /// Iterate over all `(NodeId, &NodeData)` pairs in the arena.
    ///
    /// It iterates in slotmap insertion order, which is deterministic but not
    /// tree-order.
    fn iter_nodes(&self) -> impl Iterator<Item = (NodeId, &NodeData)> {
        self.nodes.iter()
    }
}
