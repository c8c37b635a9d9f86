//! Events delivered to attached listeners.
//!
//! An [`Event`] names what happened and where. Dispatch walks the composed
//! path from the target up to the document root, crossing from each scope
//! root to its host, until a listener stops propagation.

use std::cell::Cell;
use std::fmt;

use crate::component::ComponentId;
use crate::dom::{Dom, NodeId};

/// Payload carried by an event.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EventDetail {
    #[default]
    None,
    /// The instance an event is about, e.g. the one that just became ready.
    Component(ComponentId),
    Text(String),
}

/// A named event aimed at a node.
pub struct Event {
    name: String,
    target: NodeId,
    detail: EventDetail,
    stopped: Cell<bool>,
}

impl Event {
    pub fn new(name: impl Into<String>, target: NodeId) -> Self {
        Self {
            name: name.into(),
            target,
            detail: EventDetail::None,
            stopped: Cell::new(false),
        }
    }

    pub fn with_detail(mut self, detail: EventDetail) -> Self {
        self.detail = detail;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The node the event was dispatched at.
    pub fn target(&self) -> NodeId {
        self.target
    }

    pub fn detail(&self) -> &EventDetail {
        &self.detail
    }

    /// The instance carried in the detail, if any.
    pub fn component(&self) -> Option<ComponentId> {
        match self.detail {
            EventDetail::Component(id) => Some(id),
            _ => None,
        }
    }

    /// Stop delivery to nodes further up the path. Listeners on the current
    /// node still run.
    pub fn stop_propagation(&self) {
        self.stopped.set(true);
    }

    pub fn is_propagation_stopped(&self) -> bool {
        self.stopped.get()
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("name", &self.name)
            .field("target", &self.target)
            .field("detail", &self.detail)
            .field("stopped", &self.stopped.get())
            .finish()
    }
}

/// The delivery path from `start` up to the document root, inclusive.
///
/// Scope roots continue to their host. Returns an empty vec when `start` is
/// no longer in the tree.
pub fn composed_path(dom: &Dom, start: NodeId) -> Vec<NodeId> {
    if !dom.contains(start) {
        return Vec::new();
    }
    let mut path = vec![start];
    path.extend(dom.composed_ancestors(start));
    path
}

// ===========================================================================
// Tests
// ===========================================================================
