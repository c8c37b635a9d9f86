//! Tree mutation watcher: predicate → action filters over one scope.
//!
//! A watcher sees only the mutation records of its own scope (the document,
//! or one component's isolated scope). Records are batched by the DOM and
//! handed to [`MutationWatcher::collect`], which turns them into the list of
//! actions to run. Running them needs the runtime, so that part lives there.

use std::collections::HashSet;
use std::rc::Rc;

use slotmap::{new_key_type, SlotMap};

use crate::dom::{Dom, MutationRecord, NodeData, NodeId};
use crate::runtime::Runtime;

new_key_type! {
    /// Key of a registered filter within its watcher.
    pub struct FilterId;
}

/// When a filter fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterDirection {
    OnInsert,
    OnRemoval,
}

/// Tests a node. Removed nodes are tested against their last snapshot.
pub type FilterPredicate = Rc<dyn Fn(&NodeData) -> bool>;

/// Runs for each matching node. On removal the node id no longer resolves.
pub type FilterAction = Rc<dyn Fn(&mut Runtime, NodeId)>;

struct Filter {
    predicate: FilterPredicate,
    action: FilterAction,
    direction: FilterDirection,
}

/// One pending action call produced by [`MutationWatcher::collect`].
#[derive(Clone)]
pub struct Invocation {
    pub filter: FilterId,
    pub node: NodeId,
    pub direction: FilterDirection,
    pub action: FilterAction,
}

impl std::fmt::Debug for Invocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Invocation")
            .field("filter", &self.filter)
            .field("node", &self.node)
            .field("direction", &self.direction)
            .finish()
    }
}

/// Filters registered against one scope.
pub struct MutationWatcher {
    scope: NodeId,
    filters: SlotMap<FilterId, Filter>,
    /// `(filter, node)` pairs an on-insert filter already fired for.
    applied: HashSet<(FilterId, NodeId)>,
}

impl MutationWatcher {
    pub fn new(scope: NodeId) -> Self {
        Self {
            scope,
            filters: SlotMap::with_key(),
            applied: HashSet::new(),
        }
    }

    /// The scope root this watcher observes.
    pub fn scope(&self) -> NodeId {
        self.scope
    }

    pub fn register_filter(
        &mut self,
        predicate: FilterPredicate,
        action: FilterAction,
        direction: FilterDirection,
    ) -> FilterId {
        self.filters.insert(Filter {
            predicate,
            action,
            direction,
        })
    }

    /// Drop a filter. Past invocations are unaffected.
    pub fn unregister_filter(&mut self, id: FilterId) -> bool {
        if self.filters.remove(id).is_none() {
            return false;
        }
        self.applied.retain(|&(filter, _)| filter != id);
        true
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Apply a freshly registered on-insert filter to the nodes already in
    /// the scope. Each match is marked so later records do not fire it again.
    pub fn existing_matches(&mut self, dom: &Dom, id: FilterId) -> Vec<Invocation> {
        let Some(filter) = self.filters.get(id) else {
            return Vec::new();
        };
        if filter.direction != FilterDirection::OnInsert {
            return Vec::new();
        }
        let mut out = Vec::new();
        for node in dom.walk_depth_first(self.scope).into_iter().skip(1) {
            let Some(data) = dom.get(node) else { continue };
            if (filter.predicate)(data) && self.applied.insert((id, node)) {
                out.push(Invocation {
                    filter: id,
                    node,
                    direction: FilterDirection::OnInsert,
                    action: Rc::clone(&filter.action),
                });
            }
        }
        out
    }

    /// Turn a batch of records into action calls, in record order.
    ///
    /// Records from other scopes are ignored. Added nodes are tested along
    /// with their light descendants; removed nodes with their snapshots.
    pub fn collect(&mut self, dom: &Dom, records: &[MutationRecord]) -> Vec<Invocation> {
        let mut out = Vec::new();
        for record in records.iter().filter(|r| r.scope() == self.scope) {
            match record {
                MutationRecord::Added { node, .. } => {
                    for current in dom.walk_depth_first(*node) {
                        let Some(data) = dom.get(current) else { continue };
                        for (id, filter) in &self.filters {
                            if filter.direction == FilterDirection::OnInsert
                                && (filter.predicate)(data)
                                && self.applied.insert((id, current))
                            {
                                out.push(Invocation {
                                    filter: id,
                                    node: current,
                                    direction: FilterDirection::OnInsert,
                                    action: Rc::clone(&filter.action),
                                });
                            }
                        }
                    }
                }
                MutationRecord::Removed { nodes, .. } => {
                    for removed in nodes {
                        self.applied.retain(|&(_, node)| node != removed.id);
                        for (id, filter) in &self.filters {
                            if filter.direction == FilterDirection::OnRemoval
                                && (filter.predicate)(&removed.data)
                            {
                                out.push(Invocation {
                                    filter: id,
                                    node: removed.id,
                                    direction: FilterDirection::OnRemoval,
                                    action: Rc::clone(&filter.action),
                                });
                            }
                        }
                    }
                }
            }
        }
        out
    }
}

impl std::fmt::Debug for MutationWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutationWatcher")
            .field("scope", &self.scope)
            .field("filters", &self.filters.len())
            .field("applied", &self.applied.len())
            .finish()
    }
}
