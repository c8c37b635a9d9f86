//! Component instances: identity, declarative configuration, mount artifact.

use slotmap::new_key_type;

use super::anchor::{AnchorError, AnchorSpec, ResolvedTarget};
use super::lifecycle::LifecycleState;
use super::traits::Component;
use crate::config::Orientation;
use crate::dom::{NodeData, NodeId};

new_key_type! {
    /// Arena key of a live component instance. Keys of disconnected
    /// instances never resolve again.
    pub struct ComponentId;
}

/// Declarative configuration read from the instance's attributes at mount
/// time, after every same-turn attribute write has landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentConfig {
    /// Template locator handed to the template loader.
    pub template: Option<String>,
    pub anchor: AnchorSpec,
    /// Name of a registered function to invoke once when ready.
    pub onready: Option<String>,
    /// Render into the surrounding tree instead of an isolated scope.
    pub flat: bool,
}

impl ComponentConfig {
    pub fn from_node(data: &NodeData) -> Result<Self, AnchorError> {
        let anchor = match data.attribute("anchor") {
            Some(spec) => AnchorSpec::parse(&spec)?,
            None => AnchorSpec::default(),
        };
        Ok(Self {
            template: data.attribute("template").filter(|t| !t.is_empty()),
            anchor,
            onready: data.attribute("onready").filter(|f| !f.is_empty()),
            flat: is_truthy(data.attribute("flat")),
        })
    }
}

/// Boolean attribute semantics: present means true unless spelled `false`.
pub(crate) fn is_truthy(value: Option<String>) -> bool {
    value.is_some_and(|v| !v.eq_ignore_ascii_case("false"))
}

/// What an instance rendered, and whether it owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountArtifact {
    /// Content created by this instance; destroyed on disconnect. `root` is
    /// the scope root for isolated rendering or the content node for flat
    /// rendering.
    Owned { root: NodeId },
    /// Content of another instance this proxy links to. Never destroyed by
    /// the proxy.
    Alias { source: ComponentId, root: NodeId },
}

impl MountArtifact {
    pub fn root(self) -> NodeId {
        match self {
            Self::Owned { root } | Self::Alias { root, .. } => root,
        }
    }
}

/// An attribute write waiting to be forwarded to the component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PendingAttribute {
    pub name: String,
    /// Value before the first write of the batch.
    pub old: Option<String>,
    /// Value after the last write of the batch.
    pub new: Option<String>,
}

/// A live component instance.
pub struct ComponentInstance {
    pub(crate) node: NodeId,
    pub(crate) tag: String,
    pub(crate) identity: String,
    pub(crate) state: LifecycleState,
    pub(crate) config: Option<ComponentConfig>,
    pub(crate) target: Option<ResolvedTarget>,
    pub(crate) artifact: Option<MountArtifact>,
    pub(crate) flat: bool,
    /// Isolated scope attached to `node`, if this instance rendered into one.
    pub(crate) scope: Option<NodeId>,
    /// Taken out while a hook runs so the hook can borrow the runtime.
    pub(crate) behavior: Option<Box<dyn Component>>,
    /// Copied from the behavior at creation; hooks run with it taken out.
    pub(crate) observed: Vec<String>,
    pub(crate) pending_attributes: Vec<PendingAttribute>,
    pub(crate) failure: Option<String>,
}

impl ComponentInstance {
    pub(crate) fn new(node: NodeId, tag: String, behavior: Box<dyn Component>) -> Self {
        let observed = behavior
            .observed_attributes()
            .iter()
            .map(|name| name.to_ascii_lowercase())
            .collect();
        Self {
            node,
            tag,
            identity: String::new(),
            state: LifecycleState::Unmounted,
            config: None,
            target: None,
            artifact: None,
            flat: false,
            scope: None,
            behavior: Some(behavior),
            observed,
            pending_attributes: Vec::new(),
            failure: None,
        }
    }

    /// The element this instance is bound to.
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// The tag the component was defined under; the registry's name key.
    pub fn name(&self) -> &str {
        &self.tag
    }

    /// Stable identity (the `id` attribute, generated when absent).
    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Configuration read at mount time.
    pub fn config(&self) -> Option<&ComponentConfig> {
        self.config.as_ref()
    }

    /// Where the content went, once resolved.
    pub fn target(&self) -> Option<ResolvedTarget> {
        self.target
    }

    /// Whether the resolved target is neither the instance nor its parent.
    pub fn is_proxy(&self) -> bool {
        self.target.is_some_and(|t| t.is_proxy)
    }

    pub fn artifact(&self) -> Option<MountArtifact> {
        self.artifact
    }

    /// The instance whose content this proxy aliases.
    pub fn proxy_of(&self) -> Option<ComponentId> {
        match self.artifact {
            Some(MountArtifact::Alias { source, .. }) => Some(source),
            _ => None,
        }
    }

    pub fn is_flat(&self) -> bool {
        self.flat
    }

    pub fn scope(&self) -> Option<NodeId> {
        self.scope
    }

    /// Why mounting failed, for instances in [`LifecycleState::Failed`].
    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    /// Whether changes to `name` are forwarded to the component.
    pub fn observes(&self, name: &str) -> bool {
        self.observed.iter().any(|o| o.eq_ignore_ascii_case(name))
    }
}

impl std::fmt::Debug for ComponentInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentInstance")
            .field("identity", &self.identity)
            .field("tag", &self.tag)
            .field("node", &self.node)
            .field("state", &self.state)
            .field("artifact", &self.artifact)
            .field("flat", &self.flat)
            .finish()
    }
}

/// The orientation an instance asks for, if any.
pub(crate) fn requested_orientation(data: &NodeData) -> Option<Orientation> {
    data.attribute("orientation").and_then(|o| Orientation::parse(&o))
}
