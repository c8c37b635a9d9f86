//! Component trait: the override points concrete components supply.
//!
//! The runtime drives every instance through the same lifecycle and calls
//! into the concrete component only through this trait. Everything has a
//! no-op default except the `Any` upcasts used for downcasting.

use std::any::Any;

use super::instance::ComponentId;
use crate::dom::NodeId;
use crate::event::Callback;
use crate::runtime::Runtime;

// ---------------------------------------------------------------------------
// Component trait
// ---------------------------------------------------------------------------

/// Behavior of a concrete component.
///
/// Object-safe: the runtime stores components as `Box<dyn Component>`.
pub trait Component {
    /// Template locator used when the element has no `template` attribute.
    fn template(&self) -> Option<&str> {
        None
    }

    /// Attributes whose changes are forwarded to [`Component::attribute_callback`].
    ///
    /// `id` and `orientation` are handled by the runtime and never forwarded.
    fn observed_attributes(&self) -> &[&str] {
        &[]
    }

    /// Called once, when the instance passes the ready checkpoint.
    fn on_ready(&mut self, _ctx: &mut Context<'_>) {}

    /// Called once per observed attribute per batch, with the value before the
    /// first write of the batch and the final value.
    fn attribute_callback(
        &mut self,
        _ctx: &mut Context<'_>,
        _name: &str,
        _old: Option<&str>,
        _new: Option<&str>,
    ) {
    }

    /// Downcast to `&dyn Any` for runtime type inspection.
    fn as_any(&self) -> &dyn Any;

    /// Downcast to `&mut dyn Any` for mutable runtime type inspection.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

/// Access to the runtime from inside a component hook.
pub struct Context<'a> {
    pub runtime: &'a mut Runtime,
    pub id: ComponentId,
    pub node: NodeId,
}

impl Context<'_> {
    /// The instance's identity, if it is still live.
    pub fn identity(&self) -> Option<&str> {
        self.runtime.instance(self.id).map(|i| i.identity())
    }

    /// Read an attribute of the instance's element.
    pub fn attribute(&self, name: &str) -> Option<String> {
        self.runtime.dom().attribute(self.node, name)
    }

    /// Root of the instance's rendered content (its own or the aliased one).
    pub fn content_root(&self) -> Option<NodeId> {
        self.runtime
            .instance(self.id)
            .and_then(|i| i.artifact())
            .map(|a| a.root())
    }

    /// Attach a listener owned by this instance. It is detached automatically
    /// when the instance disconnects.
    pub fn listen(&mut self, target: NodeId, event: &str, callback: &Callback, once: bool) -> bool {
        self.runtime.attach(self.node, target, event, callback, once)
    }
}
