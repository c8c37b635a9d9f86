//! The component runtime.
//!
//! [`Runtime`] owns the node tree and every service the component lifecycle
//! leans on: the component registry, the listener table, the per-scope
//! mutation watchers, and the task queue. All of them are plain fields, so a
//! test builds a fresh runtime per case and nothing is global.
//!
//! Work is split across files by concern:
//!
//! - `tree`: structural and attribute mutations, and what they trigger
//! - `lifecycle`: connect, mount, ready, attribute flush, disconnect
//! - `events`: listener attachment and dispatch
//! - `mutations`: watcher filters and mutation delivery
//! - `driver`: ticking, settling, and the async frame loop

mod driver;
mod events;
mod lifecycle;
mod mutations;
mod tree;

pub use lifecycle::MountError;
pub use mutations::FilterHandle;

use std::collections::HashMap;
use std::future::Future;
use std::rc::Rc;
use std::time::Duration;

use slotmap::SlotMap;

use crate::component::{
    Component, ComponentId, ComponentInstance, LifecycleEvent, LifecycleJournal, LifecycleState,
};
use crate::config::{Environment, RuntimeConfig};
use crate::dom::{Dom, NodeData, NodeId};
use crate::event::ListenerRegistry;
use crate::registry::{ComponentRegistry, WaitError};
use crate::schedule::TaskQueue;
use crate::template::{InlineTemplates, TemplateLoader};
use crate::watcher::MutationWatcher;

/// Builds the behavior for a newly connected element.
pub type ComponentFactory = Rc<dyn Fn() -> Box<dyn Component>>;

/// A function an element can name in its `onready` attribute.
pub type ReadyFunction = Rc<dyn Fn(&mut Runtime, ComponentId)>;

/// Tag of the document root node.
pub const DOCUMENT_TAG: &str = "document";

/// Single-threaded component runtime over an in-memory node tree.
pub struct Runtime {
    pub(crate) dom: Dom,
    pub(crate) config: RuntimeConfig,
    pub(crate) registry: ComponentRegistry,
    pub(crate) listeners: ListenerRegistry,
    pub(crate) tasks: TaskQueue,
    pub(crate) journal: LifecycleJournal,
    pub(crate) definitions: HashMap<String, ComponentFactory>,
    pub(crate) instances: SlotMap<ComponentId, ComponentInstance>,
    /// Element → the instance bound to it.
    pub(crate) bound: HashMap<NodeId, ComponentId>,
    /// Scope root → its watcher. The document root always has one.
    pub(crate) watchers: HashMap<NodeId, MutationWatcher>,
    pub(crate) functions: HashMap<String, ReadyFunction>,
    pub(crate) templates: Box<dyn TemplateLoader>,
    /// Counter behind generated identities.
    pub(crate) generated: u64,
    root: NodeId,
}

impl Runtime {
    /// Create a runtime with an empty document.
    pub fn new(config: RuntimeConfig) -> Self {
        let mut dom = Dom::new();
        let root = dom.insert(NodeData::new(DOCUMENT_TAG));
        let mut watchers = HashMap::new();
        watchers.insert(root, MutationWatcher::new(root));
        Self {
            dom,
            config,
            registry: ComponentRegistry::new(),
            listeners: ListenerRegistry::new(),
            tasks: TaskQueue::new(),
            journal: LifecycleJournal::new(),
            definitions: HashMap::new(),
            instances: SlotMap::with_key(),
            bound: HashMap::new(),
            watchers,
            functions: HashMap::new(),
            templates: Box::new(InlineTemplates::new()),
            generated: 0,
            root,
        }
    }

    /// Replace the template loader (builder).
    pub fn with_templates(mut self, loader: impl TemplateLoader + 'static) -> Self {
        self.templates = Box::new(loader);
        self
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn environment(&self) -> &Environment {
        &self.config.environment
    }

    /// Read-only view of the tree. Mutations go through the runtime.
    pub fn dom(&self) -> &Dom {
        &self.dom
    }

    /// The document root.
    pub fn root(&self) -> NodeId {
        self.root
    }

    // -----------------------------------------------------------------------
    // Definitions
    // -----------------------------------------------------------------------

    /// Define a component for `tag`. Elements already in the document with
    /// that tag are upgraded right away.
    pub fn define<F>(&mut self, tag: &str, factory: F)
    where
        F: Fn() -> Box<dyn Component> + 'static,
    {
        let tag = tag.to_ascii_lowercase();
        self.definitions.insert(tag.clone(), Rc::new(factory));
        let pending: Vec<NodeId> = self
            .dom
            .walk_composed(self.root)
            .into_iter()
            .filter(|node| !self.bound.contains_key(node))
            .filter(|&node| {
                self.dom
                    .get(node)
                    .is_some_and(|data| data.is_element() && data.tag.eq_ignore_ascii_case(&tag))
            })
            .collect();
        for node in pending {
            self.connect(node);
        }
    }

    /// Whether a component is defined for `tag`.
    pub fn is_defined(&self, tag: &str) -> bool {
        self.definitions.contains_key(&tag.to_ascii_lowercase())
    }

    /// Register a function elements can name in their `onready` attribute.
    pub fn register_function<F>(&mut self, name: &str, function: F)
    where
        F: Fn(&mut Runtime, ComponentId) + 'static,
    {
        self.functions.insert(name.to_owned(), Rc::new(function));
    }

    // -----------------------------------------------------------------------
    // Lookup
    // -----------------------------------------------------------------------

    /// The live instance holding `identity`.
    pub fn get(&self, identity: &str) -> Option<ComponentId> {
        self.registry.get(identity)
    }

    /// Live instances defined under `tag`, filtered by rendering strategy.
    pub fn find_all(&self, tag: &str, include_flat: bool, include_isolated: bool) -> Vec<ComponentId> {
        self.registry
            .find_all(&tag.to_ascii_lowercase(), include_flat, include_isolated)
    }

    /// The nearest instance enclosing `node` in the composed tree, optionally
    /// restricted to one tag. `node` itself is not considered.
    pub fn get_owner(&self, node: NodeId, tag: Option<&str>) -> Option<ComponentId> {
        self.dom
            .composed_ancestors(node)
            .into_iter()
            .filter_map(|ancestor| self.bound.get(&ancestor).copied())
            .find(|&id| {
                self.instances.get(id).is_some_and(|inst| {
                    !inst.state.is_disconnected()
                        && tag.map_or(true, |t| inst.tag.eq_ignore_ascii_case(t))
                })
            })
    }

    /// The instance bound to `node`, if any.
    pub fn instance_at(&self, node: NodeId) -> Option<ComponentId> {
        self.bound.get(&node).copied()
    }

    pub fn instance(&self, id: ComponentId) -> Option<&ComponentInstance> {
        self.instances.get(id)
    }

    /// Lifecycle state of a live instance. Disconnected instances are gone,
    /// so this returns `None` for them.
    pub fn state_of(&self, id: ComponentId) -> Option<LifecycleState> {
        self.instances.get(id).map(|inst| inst.state)
    }

    /// Borrow an instance's behavior as its concrete type.
    ///
    /// Returns `None` while one of the instance's own hooks is running.
    pub fn component<T: Component + 'static>(&self, id: ComponentId) -> Option<&T> {
        self.instances
            .get(id)?
            .behavior
            .as_ref()?
            .as_any()
            .downcast_ref::<T>()
    }

    pub fn component_mut<T: Component + 'static>(&mut self, id: ComponentId) -> Option<&mut T> {
        self.instances
            .get_mut(id)?
            .behavior
            .as_mut()?
            .as_any_mut()
            .downcast_mut::<T>()
    }

    /// Number of live instances, rejected ones awaiting removal included.
    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    /// Drain the lifecycle events recorded since the last call.
    pub fn take_lifecycle_events(&mut self) -> Vec<LifecycleEvent> {
        self.journal.pending_events()
    }

    // -----------------------------------------------------------------------
    // Waiting
    // -----------------------------------------------------------------------

    /// Wait for an instance whose identity or tag is `key` to exist.
    ///
    /// The returned future owns everything it needs, so the runtime can keep
    /// ticking while it is pending. A zero `timeout` waits forever.
    pub fn wait_for(
        &mut self,
        key: &str,
        timeout: Duration,
    ) -> impl Future<Output = Result<ComponentId, WaitError>> + 'static {
        self.registry.wait_for(key, timeout)
    }

    /// [`Runtime::wait_for`] with the configured default timeout.
    pub fn wait_for_default(
        &mut self,
        key: &str,
    ) -> impl Future<Output = Result<ComponentId, WaitError>> + 'static {
        let timeout = self.config.wait_timeout;
        self.registry.wait_for(key, timeout)
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new(RuntimeConfig::default())
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("nodes", &self.dom.len())
            .field("instances", &self.instances.len())
            .field("registered", &self.registry.len())
            .field("listeners", &self.listeners.len())
            .field("queued", &self.tasks.len())
            .finish()
    }
}
