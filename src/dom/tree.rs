//! Tree operations: insert, insert-adjacent, remove, scopes, walk.

use std::collections::HashSet;

use slotmap::{SecondaryMap, SlotMap};

use super::mutation::{MutationRecord, RemovedNode};
use super::node::{NodeData, NodeId};

/// Empty slice constant for returning when a node has no children.
const EMPTY_CHILDREN: &[NodeId] = &[];

/// Errors from structural tree operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
    #[error("node {0:?} has been disposed")]
    Disposed(NodeId),
    #[error("node {0:?} has no parent to insert beside")]
    NoParent(NodeId),
    #[error("node {0:?} is not an element")]
    NotAnElement(NodeId),
}

/// Position of an inserted node relative to a reference node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Placement {
    /// Before the reference, as its previous sibling.
    BeforeBegin,
    /// As the reference's first child.
    AfterBegin,
    /// As the reference's last child.
    BeforeEnd,
    /// After the reference, as its next sibling.
    AfterEnd,
}

impl Placement {
    /// Parse a placement keyword, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "beforebegin" => Some(Self::BeforeBegin),
            "afterbegin" => Some(Self::AfterBegin),
            "beforeend" => Some(Self::BeforeEnd),
            "afterend" => Some(Self::AfterEnd),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::BeforeBegin => "beforebegin",
            Self::AfterBegin => "afterbegin",
            Self::BeforeEnd => "beforeend",
            Self::AfterEnd => "afterend",
        }
    }
}

/// The node tree, backed by a slotmap arena.
///
/// All nodes live in a single `SlotMap`. Parent/child relationships are stored
/// in secondary maps so that node removal is O(subtree size) and lookup is O(1).
/// Isolated scopes hang off their host through `scopes`/`scope_hosts` and are
/// never listed among the host's children, so light traversal stops at them.
pub struct Dom {
    pub(crate) nodes: SlotMap<NodeId, NodeData>,
    children: SecondaryMap<NodeId, Vec<NodeId>>,
    parent: SecondaryMap<NodeId, NodeId>,
    scopes: SecondaryMap<NodeId, NodeId>,
    scope_hosts: SecondaryMap<NodeId, NodeId>,
    root: Option<NodeId>,
    records: Vec<MutationRecord>,
}

impl Dom {
    /// Create an empty DOM.
    pub fn new() -> Self {
        Self {
            nodes: SlotMap::with_key(),
            children: SecondaryMap::new(),
            parent: SecondaryMap::new(),
            scopes: SecondaryMap::new(),
            scope_hosts: SecondaryMap::new(),
            root: None,
            records: Vec::new(),
        }
    }

    /// Insert a root-level node (no parent).
    ///
    /// If no root has been set yet, this node becomes the root.
    pub fn insert(&mut self, data: NodeData) -> NodeId {
        let id = self.nodes.insert(data);
        self.children.insert(id, Vec::new());
        if self.root.is_none() {
            self.root = Some(id);
        }
        id
    }

    /// Insert a node as the last child of `parent`.
    pub fn insert_child(&mut self, parent: NodeId, data: NodeData) -> Result<NodeId, DomError> {
        let len = self.children(parent).len();
        self.insert_at(parent, len, data)
    }

    /// Insert a node relative to `reference` with insert-adjacent semantics.
    pub fn insert_adjacent(
        &mut self,
        reference: NodeId,
        placement: Placement,
        data: NodeData,
    ) -> Result<NodeId, DomError> {
        if !self.contains(reference) {
            return Err(DomError::Disposed(reference));
        }
        match placement {
            Placement::AfterBegin => self.insert_at(reference, 0, data),
            Placement::BeforeEnd => self.insert_child(reference, data),
            Placement::BeforeBegin | Placement::AfterEnd => {
                let parent = self.parent(reference).ok_or(DomError::NoParent(reference))?;
                let pos = self
                    .children(parent)
                    .iter()
                    .position(|&c| c == reference)
                    .unwrap_or(0);
                let index = if placement == Placement::AfterEnd { pos + 1 } else { pos };
                self.insert_at(parent, index, data)
            }
        }
    }

    fn insert_at(&mut self, parent: NodeId, index: usize, data: NodeData) -> Result<NodeId, DomError> {
        if !self.nodes.contains_key(parent) {
            return Err(DomError::Disposed(parent));
        }
        let id = self.nodes.insert(data);
        self.children.insert(id, Vec::new());
        self.parent.insert(id, parent);
        if let Some(siblings) = self.children.get_mut(parent) {
            let index = index.min(siblings.len());
            siblings.insert(index, id);
        }
        let scope = self.scope_root_of(parent);
        self.records.push(MutationRecord::Added { scope, node: id });
        Ok(id)
    }

    /// Attach an isolated scope to `host`, returning the scope root.
    ///
    /// A host has at most one scope; attaching again returns the existing one.
    pub fn attach_scope(&mut self, host: NodeId) -> Result<NodeId, DomError> {
        let data = self.nodes.get(host).ok_or(DomError::Disposed(host))?;
        if !data.is_element() {
            return Err(DomError::NotAnElement(host));
        }
        if let Some(&existing) = self.scopes.get(host) {
            return Ok(existing);
        }
        let scope = self.nodes.insert(NodeData::scope());
        self.children.insert(scope, Vec::new());
        self.scopes.insert(host, scope);
        self.scope_hosts.insert(scope, host);
        Ok(scope)
    }

    /// The isolated scope attached to `host`, if any.
    pub fn scope_of(&self, host: NodeId) -> Option<NodeId> {
        self.scopes.get(host).copied()
    }

    /// The host a scope root is attached to.
    pub fn scope_host(&self, scope: NodeId) -> Option<NodeId> {
        self.scope_hosts.get(scope).copied()
    }

    /// The root of the scope `id` lives in: the nearest scope root above it,
    /// or the top of its tree (the document root for connected nodes).
    pub fn scope_root_of(&self, id: NodeId) -> NodeId {
        let mut current = id;
        while let Some(p) = self.parent.get(current).copied() {
            current = p;
        }
        current
    }

    /// Remove a node and all its descendants, including attached scopes.
    ///
    /// Returns snapshots of every removed node in composed pre-order, or an
    /// empty vec if `id` didn't exist. A removal record listing the node's
    /// light subtree is queued for the scope the node lived in.
    pub fn remove(&mut self, id: NodeId) -> Vec<RemovedNode> {
        if !self.nodes.contains_key(id) {
            return Vec::new();
        }
        let scope = self.scope_root_of(id);
        let light: HashSet<NodeId> = self.walk_depth_first(id).into_iter().collect();
        let order = self.walk_composed(id);

        // Detach from parent's children list.
        if let Some(parent_id) = self.parent.remove(id) {
            if let Some(siblings) = self.children.get_mut(parent_id) {
                siblings.retain(|&child| child != id);
            }
        }
        if let Some(host) = self.scope_hosts.remove(id) {
            self.scopes.remove(host);
        }
        if self.root == Some(id) {
            self.root = None;
        }

        let mut removed = Vec::with_capacity(order.len());
        for current in order {
            self.children.remove(current);
            self.parent.remove(current);
            if let Some(scope_root) = self.scopes.remove(current) {
                self.scope_hosts.remove(scope_root);
            }
            if let Some(data) = self.nodes.remove(current) {
                removed.push(RemovedNode { id: current, data });
            }
        }

        let nodes = removed
            .iter()
            .filter(|r| light.contains(&r.id))
            .cloned()
            .collect();
        self.records.push(MutationRecord::Removed { scope, nodes });
        removed
    }

    /// Write an attribute, returning the previous value.
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: impl Into<String>) -> Result<Option<String>, DomError> {
        let data = self.nodes.get_mut(id).ok_or(DomError::Disposed(id))?;
        Ok(data.set_attribute(name, value.into()))
    }

    /// Remove an attribute, returning the previous value.
    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Result<Option<String>, DomError> {
        let data = self.nodes.get_mut(id).ok_or(DomError::Disposed(id))?;
        Ok(data.remove_attribute(name))
    }

    /// Read an attribute of a live node.
    pub fn attribute(&self, id: NodeId, name: &str) -> Option<String> {
        self.nodes.get(id).and_then(|data| data.attribute(name))
    }

    /// Drain the pending mutation records.
    pub fn take_records(&mut self) -> Vec<MutationRecord> {
        std::mem::take(&mut self.records)
    }

    /// Whether mutation records are waiting to be delivered.
    pub fn has_records(&self) -> bool {
        !self.records.is_empty()
    }

    /// Get the parent of a node, if it has one. Scope roots have none.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.parent.get(id).copied()
    }

    /// Parent in the composed tree: the structural parent, or the host for a
    /// scope root.
    pub fn composed_parent(&self, id: NodeId) -> Option<NodeId> {
        self.parent(id).or_else(|| self.scope_host(id))
    }

    /// Get the children of a node. Returns an empty slice if the node has no children
    /// or does not exist.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.children
            .get(id)
            .map(Vec::as_slice)
            .unwrap_or(EMPTY_CHILDREN)
    }

    /// Walk from `id` up to the top of its scope, collecting ancestor node ids.
    ///
    /// The returned vec does **not** include `id` itself; it starts with the
    /// immediate parent.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut current = id;
        while let Some(p) = self.parent.get(current).copied() {
            result.push(p);
            current = p;
        }
        result
    }

    /// Like [`Dom::ancestors`], but crosses scope roots to their hosts.
    pub fn composed_ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut current = id;
        while let Some(p) = self.composed_parent(current) {
            result.push(p);
            current = p;
        }
        result
    }

    /// Whether `node` is `ancestor` or lies below it in the composed tree.
    pub fn is_composed_descendant(&self, node: NodeId, ancestor: NodeId) -> bool {
        node == ancestor || self.composed_ancestors(node).contains(&ancestor)
    }

    /// Immutable access to a node's data.
    pub fn get(&self, id: NodeId) -> Option<&NodeData> {
        self.nodes.get(id)
    }

    /// Mutable access to a node's data.
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut NodeData> {
        self.nodes.get_mut(id)
    }

    /// The current root node, if set.
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Number of nodes in the DOM, scope contents included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the DOM is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether the DOM contains a node with the given id.
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Pre-order depth-first traversal of the light tree starting from `start`.
    pub fn walk_depth_first(&self, start: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut stack = vec![start];
        while let Some(current) = stack.pop() {
            if !self.nodes.contains_key(current) {
                continue;
            }
            result.push(current);
            // Push children in reverse so the first child is visited first.
            let kids = self.children(current);
            for &child in kids.iter().rev() {
                stack.push(child);
            }
        }
        result
    }

    /// Pre-order traversal that pierces scopes: a host is followed by its
    /// scope subtree, then by its light children.
    pub fn walk_composed(&self, start: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut stack = vec![start];
        while let Some(current) = stack.pop() {
            if !self.nodes.contains_key(current) {
                continue;
            }
            result.push(current);
            for &child in self.children(current).iter().rev() {
                stack.push(child);
            }
            if let Some(scope) = self.scope_of(current) {
                stack.push(scope);
            }
        }
        result
    }
}

impl Default for Dom {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a small test tree:
    /// ```text
    ///       root
    ///      /    \
    ///    a        b
    ///   / \
    ///  c   d
    /// ```
    fn build_tree() -> (Dom, NodeId, NodeId, NodeId, NodeId, NodeId) {
        let mut dom = Dom::new();
        let root = dom.insert(NodeData::new("body").with_id("root"));
        let a = dom.insert_child(root, NodeData::new("section").with_id("a")).unwrap();
        let b = dom.insert_child(root, NodeData::new("section").with_id("b")).unwrap();
        let c = dom.insert_child(a, NodeData::new("button").with_id("c")).unwrap();
        let d = dom.insert_child(a, NodeData::new("label").with_id("d")).unwrap();
        dom.take_records();
        (dom, root, a, b, c, d)
    }

    #[test]
    fn insert_sets_root() {
        let mut dom = Dom::new();
        let id = dom.insert(NodeData::new("body"));
        assert_eq!(dom.root(), Some(id));
    }

    #[test]
    fn insert_child_parent_relationship() {
        let (dom, root, a, b, c, _d) = build_tree();
        assert_eq!(dom.parent(a), Some(root));
        assert_eq!(dom.parent(c), Some(a));
        assert_eq!(dom.parent(root), None);
        assert_eq!(dom.children(root), &[a, b]);
    }

    #[test]
    fn insert_child_into_disposed_parent() {
        let (mut dom, _root, a, ..) = build_tree();
        dom.remove(a);
        let err = dom.insert_child(a, NodeData::new("p")).unwrap_err();
        assert_eq!(err, DomError::Disposed(a));
    }

    #[test]
    fn insert_adjacent_positions() {
        let (mut dom, root, a, b, c, d) = build_tree();
        let before = dom.insert_adjacent(a, Placement::BeforeBegin, NodeData::new("x")).unwrap();
        let after = dom.insert_adjacent(a, Placement::AfterEnd, NodeData::new("y")).unwrap();
        assert_eq!(dom.children(root), &[before, a, after, b]);

        let first = dom.insert_adjacent(a, Placement::AfterBegin, NodeData::new("f")).unwrap();
        let last = dom.insert_adjacent(a, Placement::BeforeEnd, NodeData::new("l")).unwrap();
        assert_eq!(dom.children(a), &[first, c, d, last]);
    }

    #[test]
    fn insert_adjacent_sibling_of_root_fails() {
        let (mut dom, root, ..) = build_tree();
        let err = dom
            .insert_adjacent(root, Placement::AfterEnd, NodeData::new("x"))
            .unwrap_err();
        assert_eq!(err, DomError::NoParent(root));
    }

    #[test]
    fn placement_parse_roundtrip() {
        for p in [
            Placement::BeforeBegin,
            Placement::AfterBegin,
            Placement::BeforeEnd,
            Placement::AfterEnd,
        ] {
            assert_eq!(Placement::parse(p.as_str()), Some(p));
        }
        assert_eq!(Placement::parse("BeforeEnd"), Some(Placement::BeforeEnd));
        assert_eq!(Placement::parse("inside"), None);
    }

    #[test]
    fn ancestors() {
        let (dom, root, a, _b, c, _d) = build_tree();
        assert_eq!(dom.ancestors(c), vec![a, root]);
        assert!(dom.ancestors(root).is_empty());
    }

    #[test]
    fn scopes_are_not_children() {
        let (mut dom, root, a, _b, c, _d) = build_tree();
        let scope = dom.attach_scope(a).unwrap();
        let inner = dom.insert_child(scope, NodeData::new("span")).unwrap();

        assert!(!dom.children(a).contains(&scope));
        assert_eq!(dom.scope_of(a), Some(scope));
        assert_eq!(dom.scope_host(scope), Some(a));
        assert_eq!(dom.parent(scope), None);
        assert_eq!(dom.composed_parent(scope), Some(a));
        assert_eq!(dom.ancestors(inner), vec![scope]);
        assert_eq!(dom.composed_ancestors(inner), vec![scope, a, root]);
        assert_eq!(dom.scope_root_of(inner), scope);
        assert_eq!(dom.scope_root_of(c), root);
        assert!(dom.is_composed_descendant(inner, root));
    }

    #[test]
    fn attach_scope_twice_returns_same_root() {
        let (mut dom, _root, a, ..) = build_tree();
        let first = dom.attach_scope(a).unwrap();
        assert_eq!(dom.attach_scope(a).unwrap(), first);
    }

    #[test]
    fn walk_composed_enters_scopes() {
        let (mut dom, root, a, b, c, d) = build_tree();
        let scope = dom.attach_scope(a).unwrap();
        let inner = dom.insert_child(scope, NodeData::new("span")).unwrap();
        assert_eq!(dom.walk_depth_first(root), vec![root, a, c, d, b]);
        assert_eq!(dom.walk_composed(root), vec![root, a, scope, inner, c, d, b]);
    }

    #[test]
    fn remove_subtree_with_scope() {
        let (mut dom, root, a, b, c, d) = build_tree();
        let scope = dom.attach_scope(a).unwrap();
        let inner = dom.insert_child(scope, NodeData::new("span")).unwrap();
        dom.take_records();

        let removed = dom.remove(a);
        let ids: Vec<NodeId> = removed.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![a, scope, inner, c, d]);
        for id in [a, scope, inner, c, d] {
            assert!(!dom.contains(id));
        }
        assert_eq!(dom.children(root), &[b]);
        assert_eq!(dom.len(), 2);
    }

    #[test]
    fn remove_records_light_subtree_only() {
        let (mut dom, root, a, _b, c, d) = build_tree();
        let scope = dom.attach_scope(a).unwrap();
        dom.insert_child(scope, NodeData::new("span")).unwrap();
        dom.take_records();

        dom.remove(a);
        let records = dom.take_records();
        assert_eq!(records.len(), 1);
        match &records[0] {
            MutationRecord::Removed { scope, nodes } => {
                assert_eq!(*scope, root);
                let ids: Vec<NodeId> = nodes.iter().map(|r| r.id).collect();
                assert_eq!(ids, vec![a, c, d]);
            }
            other => panic!("unexpected record: {other:?}"),
        }
    }

    #[test]
    fn insert_records_scope() {
        let (mut dom, root, a, ..) = build_tree();
        let scope = dom.attach_scope(a).unwrap();
        let inner = dom.insert_child(scope, NodeData::new("span")).unwrap();
        let outer = dom.insert_child(root, NodeData::new("p")).unwrap();
        assert_eq!(
            dom.take_records(),
            vec![
                MutationRecord::Added { scope, node: inner },
                MutationRecord::Added { scope: root, node: outer },
            ]
        );
        assert!(!dom.has_records());
    }

    #[test]
    fn remove_nonexistent() {
        let mut dom = Dom::new();
        let id = dom.insert(NodeData::new("X"));
        dom.remove(id);
        assert!(dom.remove(id).is_empty());
        assert_eq!(dom.root(), None);
    }

    #[test]
    fn attributes_on_disposed_node() {
        let (mut dom, _root, a, ..) = build_tree();
        assert_eq!(dom.set_attribute(a, "mode", "x").unwrap(), None);
        assert_eq!(dom.attribute(a, "mode").as_deref(), Some("x"));
        dom.remove(a);
        assert_eq!(dom.set_attribute(a, "mode", "y"), Err(DomError::Disposed(a)));
    }
}
