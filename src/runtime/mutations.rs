//! Watcher filters and mutation delivery.

use std::rc::Rc;

use crate::dom::{NodeData, NodeId};
use crate::watcher::{FilterDirection, FilterId, Invocation, MutationWatcher};

use super::Runtime;

/// Identifies a filter registered on one scope's watcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FilterHandle {
    pub scope: NodeId,
    pub id: FilterId,
}

impl Runtime {
    /// Register a filter on the document watcher.
    pub fn observe<P, A>(&mut self, predicate: P, action: A, direction: FilterDirection) -> FilterHandle
    where
        P: Fn(&NodeData) -> bool + 'static,
        A: Fn(&mut Runtime, NodeId) + 'static,
    {
        let root = self.root();
        let watcher = self
            .watchers
            .entry(root)
            .or_insert_with(|| MutationWatcher::new(root));
        let id = watcher.register_filter(Rc::new(predicate), Rc::new(action), direction);
        let existing = watcher.existing_matches(&self.dom, id);
        self.invoke(existing);
        FilterHandle { scope: root, id }
    }

    /// Register a filter on the watcher of `scope` (the document root or an
    /// instance's isolated scope).
    ///
    /// On-insert filters run right away, once, for matching nodes already in
    /// the scope. Returns `None` if `scope` has no watcher.
    pub fn register_filter<P, A>(
        &mut self,
        scope: NodeId,
        predicate: P,
        action: A,
        direction: FilterDirection,
    ) -> Option<FilterHandle>
    where
        P: Fn(&NodeData) -> bool + 'static,
        A: Fn(&mut Runtime, NodeId) + 'static,
    {
        let watcher = self.watchers.get_mut(&scope)?;
        let id = watcher.register_filter(Rc::new(predicate), Rc::new(action), direction);
        let existing = watcher.existing_matches(&self.dom, id);
        self.invoke(existing);
        Some(FilterHandle { scope, id })
    }

    /// Drop a filter. Returns `false` if it was already gone.
    pub fn unregister_filter(&mut self, handle: FilterHandle) -> bool {
        self.watchers
            .get_mut(&handle.scope)
            .is_some_and(|watcher| watcher.unregister_filter(handle.id))
    }

    /// Hand pending records to the watcher of each scope they belong to.
    pub(crate) fn deliver_mutations(&mut self) {
        let records = self.dom.take_records();
        if records.is_empty() {
            return;
        }
        let mut scopes: Vec<NodeId> = Vec::new();
        for record in &records {
            if !scopes.contains(&record.scope()) {
                scopes.push(record.scope());
            }
        }
        let mut invocations = Vec::new();
        for scope in scopes {
            if let Some(watcher) = self.watchers.get_mut(&scope) {
                invocations.extend(watcher.collect(&self.dom, &records));
            }
        }
        self.invoke(invocations);
    }

    fn invoke(&mut self, invocations: Vec<Invocation>) {
        for invocation in invocations {
            (invocation.action)(self, invocation.node);
        }
    }
}
