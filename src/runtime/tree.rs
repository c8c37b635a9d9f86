//! Tree mutations routed through the runtime.
//!
//! Every structural change queues mutation delivery; insertions connect the
//! components they introduce and removals disconnect them.

use crate::config::Orientation;
use crate::dom::{DomError, NodeData, NodeId, Placement, RemovedNode};
use crate::schedule::Task;

use super::Runtime;

impl Runtime {
    /// Append `data` as the last child of `parent`.
    pub fn append_child(&mut self, parent: NodeId, data: NodeData) -> Result<NodeId, DomError> {
        let node = self.dom.insert_child(parent, data)?;
        self.inserted(node);
        Ok(node)
    }

    /// Insert `data` relative to `reference`.
    pub fn insert_adjacent(
        &mut self,
        reference: NodeId,
        placement: Placement,
        data: NodeData,
    ) -> Result<NodeId, DomError> {
        let node = self.dom.insert_adjacent(reference, placement, data)?;
        self.inserted(node);
        Ok(node)
    }

    /// Remove `node` and its composed subtree. Components inside disconnect.
    ///
    /// Returns `false` if the node was already gone.
    pub fn remove(&mut self, node: NodeId) -> bool {
        if node == self.root() {
            return false;
        }
        let removed = self.dom.remove(node);
        if removed.is_empty() {
            return false;
        }
        self.removed(&removed);
        true
    }

    /// Write an attribute and run the base runtime's attribute handling.
    pub fn set_attribute(
        &mut self,
        node: NodeId,
        name: &str,
        value: impl Into<String>,
    ) -> Result<(), DomError> {
        let value = value.into();
        let old = self.dom.set_attribute(node, name, value.clone())?;
        self.attribute_changed(node, name, old, Some(value));
        Ok(())
    }

    /// Remove an attribute and run the base runtime's attribute handling.
    pub fn remove_attribute(&mut self, node: NodeId, name: &str) -> Result<(), DomError> {
        let old = self.dom.remove_attribute(node, name)?;
        if old.is_some() {
            self.attribute_changed(node, name, old, None);
        }
        Ok(())
    }

    /// Change the host orientation and re-apply every instance's
    /// `orientation` attribute.
    pub fn set_orientation(&mut self, orientation: Orientation) {
        if self.config.environment.orientation == orientation {
            return;
        }
        self.config.environment.orientation = orientation;
        let ids: Vec<_> = self.instances.keys().collect();
        for id in ids {
            self.apply_orientation(id);
        }
    }

    fn inserted(&mut self, node: NodeId) {
        self.tasks.microtask(Task::DeliverMutations);
        if !self.dom.is_composed_descendant(node, self.root()) {
            return;
        }
        let candidates: Vec<NodeId> = self
            .dom
            .walk_composed(node)
            .into_iter()
            .filter(|n| !self.bound.contains_key(n))
            .filter(|&n| {
                self.dom
                    .get(n)
                    .is_some_and(|data| data.is_element() && self.is_defined(&data.tag))
            })
            .collect();
        for candidate in candidates {
            self.connect(candidate);
        }
    }

    pub(crate) fn removed(&mut self, removed: &[RemovedNode]) {
        self.tasks.microtask(Task::DeliverMutations);
        for snapshot in removed {
            if let Some(&id) = self.bound.get(&snapshot.id) {
                self.disconnect(id);
            }
        }
        for snapshot in removed {
            self.listeners.detach_all(snapshot.id);
            self.listeners.detach_target(snapshot.id);
        }
    }

    fn attribute_changed(&mut self, node: NodeId, name: &str, old: Option<String>, new: Option<String>) {
        let Some(&id) = self.bound.get(&node) else {
            return;
        };
        match name {
            "id" => self.rekey(id, new),
            "orientation" => self.apply_orientation(id),
            _ => self.queue_attribute(id, name, old, new),
        }
    }
}
