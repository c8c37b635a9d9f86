//! Mutation records: the tree's change-notification primitive.
//!
//! Every structural insert or remove queues a [`MutationRecord`] on the
//! [`Dom`](super::tree::Dom). Records are drained later as a batch, so
//! observers never run inside the mutating call.

use super::node::{NodeData, NodeId};

/// Snapshot of a node taken as it left the arena.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovedNode {
    pub id: NodeId,
    pub data: NodeData,
}

/// A single structural change, tagged with the scope it happened in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationRecord {
    /// `node` was inserted under a parent in `scope`.
    Added { scope: NodeId, node: NodeId },
    /// A subtree was removed from `scope`; `nodes` is its light pre-order.
    Removed { scope: NodeId, nodes: Vec<RemovedNode> },
}

impl MutationRecord {
    /// The scope root (or document root) the change happened under.
    pub fn scope(&self) -> NodeId {
        match self {
            Self::Added { scope, .. } | Self::Removed { scope, .. } => *scope,
        }
    }
}
