//! Pilot: programmatic control of a headless runtime.
//!
//! The `Pilot` wraps a [`Runtime`] and adds the shortcuts tests keep
//! reaching for: inserting under the document, stepping frames, draining the
//! lifecycle journal, and dumping the tree. [`Probe`] is a component that
//! records every hook call so tests can assert on what the runtime did.

use std::any::Any;

use crate::component::{Component, ComponentId, Context, LifecycleEvent};
use crate::config::RuntimeConfig;
use crate::dom::{DomError, NodeData, NodeId};
use crate::runtime::Runtime;
use crate::template::TemplateLoader;

use super::snapshot::dump_tree;

// ---------------------------------------------------------------------------
// Probe
// ---------------------------------------------------------------------------

/// A component that records its hook calls.
#[derive(Debug, Clone, Default)]
pub struct Probe {
    template: Option<String>,
    observed: Vec<&'static str>,
    /// Number of `on_ready` calls.
    pub ready_calls: usize,
    /// Every forwarded attribute change as `(name, old, new)`.
    pub attribute_calls: Vec<(String, Option<String>, Option<String>)>,
}

impl Probe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `locator` when the element has no `template` attribute.
    pub fn with_template(mut self, locator: impl Into<String>) -> Self {
        self.template = Some(locator.into());
        self
    }

    /// Forward changes of these attributes.
    pub fn observing(mut self, names: &[&'static str]) -> Self {
        self.observed = names.to_vec();
        self
    }

    /// A factory handing out fresh copies of this probe.
    pub fn factory(self) -> impl Fn() -> Box<dyn Component> + 'static {
        move || Box::new(self.clone()) as Box<dyn Component>
    }
}

impl Component for Probe {
    fn template(&self) -> Option<&str> {
        self.template.as_deref()
    }

    fn observed_attributes(&self) -> &[&str] {
        &self.observed
    }

    fn on_ready(&mut self, _ctx: &mut Context<'_>) {
        self.ready_calls += 1;
    }

    fn attribute_callback(
        &mut self,
        _ctx: &mut Context<'_>,
        name: &str,
        old: Option<&str>,
        new: Option<&str>,
    ) {
        self.attribute_calls
            .push((name.to_owned(), old.map(str::to_owned), new.map(str::to_owned)));
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ---------------------------------------------------------------------------
// Pilot
// ---------------------------------------------------------------------------

/// A headless runtime driver for testing.
///
/// # Examples
///
/// ```
/// use gilt_elements::dom::NodeData;
/// use gilt_elements::testing::{Pilot, Probe};
///
/// let mut pilot = Pilot::new();
/// pilot.define("x-card", Probe::new());
/// let card = pilot.insert(NodeData::new("x-card").with_id("card")).unwrap();
/// pilot.settle();
/// let id = pilot.runtime().get("card").unwrap();
/// assert_eq!(pilot.probe(id).unwrap().ready_calls, 1);
/// assert!(pilot.runtime().dom().contains(card));
/// ```
pub struct Pilot {
    runtime: Runtime,
}

impl Pilot {
    /// A runtime with the default configuration.
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    pub fn with_config(config: RuntimeConfig) -> Self {
        Self {
            runtime: Runtime::new(config),
        }
    }

    /// Replace the template loader (builder).
    pub fn with_templates(mut self, loader: impl TemplateLoader + 'static) -> Self {
        self.runtime = self.runtime.with_templates(loader);
        self
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    pub fn runtime_mut(&mut self) -> &mut Runtime {
        &mut self.runtime
    }

    /// Define `tag` as a [`Probe`] built from `probe`.
    pub fn define(&mut self, tag: &str, probe: Probe) {
        self.runtime.define(tag, probe.factory());
    }

    // ── Tree ─────────────────────────────────────────────────────────

    /// Append to the document root.
    pub fn insert(&mut self, data: NodeData) -> Result<NodeId, DomError> {
        let root = self.runtime.root();
        self.runtime.append_child(root, data)
    }

    /// Append under `parent`.
    pub fn insert_into(&mut self, parent: NodeId, data: NodeData) -> Result<NodeId, DomError> {
        self.runtime.append_child(parent, data)
    }

    pub fn remove(&mut self, node: NodeId) -> bool {
        self.runtime.remove(node)
    }

    // ── Processing ───────────────────────────────────────────────────

    /// Run `frames` frames.
    pub fn tick(&mut self, frames: usize) {
        for _ in 0..frames {
            self.runtime.tick();
        }
    }

    /// Tick until idle.
    pub fn settle(&mut self) -> bool {
        self.runtime.settle()
    }

    // ── Inspection ───────────────────────────────────────────────────

    /// Drain the lifecycle journal.
    pub fn events(&mut self) -> Vec<LifecycleEvent> {
        self.runtime.take_lifecycle_events()
    }

    /// The probe behind a live instance.
    pub fn probe(&self, id: ComponentId) -> Option<&Probe> {
        self.runtime.component::<Probe>(id)
    }

    /// Text dump of the whole composed tree.
    pub fn dump(&self) -> String {
        dump_tree(self.runtime.dom(), self.runtime.root())
    }
}

impl Default for Pilot {
    fn default() -> Self {
        Self::new()
    }
}
