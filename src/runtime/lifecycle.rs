//! Instance lifecycle: connect, mount, ready, attribute flush, disconnect.

use tracing::{debug, error, warn};

use crate::component::instance::{requested_orientation, PendingAttribute};
use crate::component::{
    AnchorError, AnchorSpec, Component, ComponentConfig, ComponentId, ComponentInstance, Context,
    GateSet, LifecycleState, MountArtifact, ResolveError, ResolvedTarget,
};
use crate::dom::{DomError, NodeData, NodeId, Placement};
use crate::event::{Event, EventDetail};
use crate::registry::RegistryEntry;
use crate::schedule::Task;
use crate::template::TemplateError;
use crate::watcher::MutationWatcher;

use super::Runtime;

/// Why an instance failed to mount.
#[derive(Debug, thiserror::Error)]
pub enum MountError {
    #[error("invalid anchor")]
    Anchor(#[from] AnchorError),
    #[error("render target unavailable")]
    Resolve(#[from] ResolveError),
    #[error("could not materialize content")]
    Dom(#[from] DomError),
}

impl Runtime {
    // -----------------------------------------------------------------------
    // Connect
    // -----------------------------------------------------------------------

    /// Bind a new instance to `node`, evaluate its gates, register it, and
    /// queue its mount.
    pub(crate) fn connect(&mut self, node: NodeId) {
        let Some(data) = self.dom.get(node) else { return };
        let tag = data.tag.to_ascii_lowercase();
        let Some(factory) = self.definitions.get(&tag).cloned() else {
            return;
        };
        let gates = GateSet::from_node(data);
        let explicit = data.id.clone().filter(|id| !id.is_empty());

        let id = self
            .instances
            .insert(ComponentInstance::new(node, tag.clone(), factory()));
        self.bound.insert(node, id);
        self.set_state(id, LifecycleState::Gated);

        if let Err(gate) = gates.evaluate(&self.config.environment) {
            debug!(tag = %tag, gate = gate.attribute(), "gate rejected component");
            self.set_state(id, LifecycleState::Disconnected);
            self.journal.on_reject(id, gate);
            self.tasks.microtask(Task::RemoveNode(node));
            return;
        }

        let identity = match explicit {
            Some(wanted) if self.registry.get(&wanted).is_none() => wanted,
            Some(wanted) => {
                let generated = self.generate_identity(&tag);
                warn!(identity = %wanted, replacement = %generated, "duplicate component identity");
                generated
            }
            None => {
                let generated = self.generate_identity(&tag);
                // Written straight to the tree: this is not a re-key.
                if let Err(err) = self.dom.set_attribute(node, "id", generated.clone()) {
                    warn!(identity = %generated, error = %err, "generated identity not written back");
                }
                generated
            }
        };
        let entry = RegistryEntry {
            id,
            identity: identity.clone(),
            name: tag,
            node,
            flat: false,
        };
        if let Err(err) = self.registry.store(entry) {
            // Unreachable with a fresh identity; keep the instance unregistered.
            warn!(identity = %identity, error = %err, "component not registered");
        }
        if let Some(inst) = self.instances.get_mut(id) {
            inst.identity = identity;
            inst.state = LifecycleState::Mounting;
        }
        self.apply_orientation(id);
        self.journal.on_connect(id);
        self.tasks.next_paint(Task::Mount(id));
    }

    fn generate_identity(&mut self, tag: &str) -> String {
        loop {
            self.generated += 1;
            let candidate = format!("{tag}-{}", self.generated);
            if self.registry.get(&candidate).is_none() && self.dom.query_by_id(&candidate).is_none() {
                return candidate;
            }
        }
    }

    fn set_state(&mut self, id: ComponentId, state: LifecycleState) {
        if let Some(inst) = self.instances.get_mut(id) {
            inst.state = state;
        }
    }

    pub(crate) fn identity_of(&self, id: ComponentId) -> String {
        self.instances
            .get(id)
            .map(|inst| inst.identity.clone())
            .unwrap_or_default()
    }

    // -----------------------------------------------------------------------
    // Mount
    // -----------------------------------------------------------------------

    /// Resolve the render target and materialize content.
    pub(crate) fn mount(&mut self, id: ComponentId) -> Result<(), MountError> {
        let Some(inst) = self.instances.get(id) else {
            return Ok(());
        };
        if inst.state != LifecycleState::Mounting {
            return Ok(());
        }
        let node = inst.node;
        let data = self.dom.get(node).ok_or(DomError::Disposed(node))?;
        let config = ComponentConfig::from_node(data)?;
        let target = config.anchor.resolve(&self.dom, node)?;

        let source = if target.is_proxy {
            match self.alias_source(id, target.node) {
                AliasSource::Wait => {
                    self.tasks.next_paint(Task::Mount(id));
                    return Ok(());
                }
                AliasSource::Ready(source, root) => Some((source, root)),
                AliasSource::None => None,
            }
        } else {
            None
        };

        let flat = config.flat || target.is_proxy || self.targeted_by_proxy(id, node);
        let (artifact, scope) = match source {
            Some((source, root)) => {
                debug!(identity = %self.identity_of(id), source = %self.identity_of(source), "proxy aliases existing content");
                (MountArtifact::Alias { source, root }, None)
            }
            None => {
                let locator = config.template.clone().or_else(|| {
                    self.instances
                        .get(id)
                        .and_then(|inst| inst.behavior.as_ref())
                        .and_then(|b| b.template().map(str::to_owned))
                });
                let content = NodeData::content(self.load_template(id, locator.as_deref()));
                self.materialize(node, target, flat, content)?
            }
        };

        if let Some(scope) = scope {
            self.watchers.insert(scope, MutationWatcher::new(scope));
        }
        if let Some(inst) = self.instances.get_mut(id) {
            inst.config = Some(config);
            inst.target = Some(target);
            inst.artifact = Some(artifact);
            inst.flat = flat;
            inst.scope = scope;
            inst.state = LifecycleState::Mounted { ready: false };
        }
        self.registry.set_flat(id, flat);
        self.journal.on_mount(id);
        self.tasks.next_paint(Task::Ready(id));
        Ok(())
    }

    /// Insert content for a non-aliased mount. Returns the artifact and the
    /// isolated scope, if one was attached.
    fn materialize(
        &mut self,
        node: NodeId,
        target: ResolvedTarget,
        flat: bool,
        content: NodeData,
    ) -> Result<(MountArtifact, Option<NodeId>), DomError> {
        if target.is_proxy {
            let placement = target.placement.unwrap_or(Placement::BeforeEnd);
            let root = self.dom.insert_adjacent(target.node, placement, content)?;
            self.tasks.microtask(Task::DeliverMutations);
            return Ok((MountArtifact::Owned { root }, None));
        }
        if flat {
            // A placement from a locator that matched the parent is honoured;
            // `self` and `parent` render in place.
            let root = match target.placement {
                Some(placement) => self.dom.insert_adjacent(target.node, placement, content)?,
                None if target.node == node => self.dom.insert_child(node, content)?,
                None => self.dom.insert_adjacent(node, Placement::AfterEnd, content)?,
            };
            self.tasks.microtask(Task::DeliverMutations);
            return Ok((MountArtifact::Owned { root }, None));
        }
        let scope = self.dom.attach_scope(node)?;
        self.dom.insert_child(scope, content)?;
        self.tasks.microtask(Task::DeliverMutations);
        Ok((MountArtifact::Owned { root: scope }, Some(scope)))
    }

    /// Decide what a proxy targeting `node` should alias: the instance bound
    /// to `node`, or else a mounted instance that rendered its own content
    /// at `node`.
    fn alias_source(&self, id: ComponentId, node: NodeId) -> AliasSource {
        if let Some(&source) = self.bound.get(&node) {
            if let Some(inst) = self.instances.get(source) {
                match (inst.state, inst.artifact) {
                    (LifecycleState::Mounted { .. }, Some(MountArtifact::Owned { root })) => {
                        return AliasSource::Ready(source, root);
                    }
                    // Wait for a plain instance; a proxy could be waiting on us.
                    (LifecycleState::Mounting, _)
                        if source != id && !self.resolves_as_proxy(inst.node) =>
                    {
                        return AliasSource::Wait;
                    }
                    _ => {}
                }
            }
        }
        self.instances
            .iter()
            .find_map(|(other, inst)| match (inst.state, inst.target, inst.artifact) {
                (
                    LifecycleState::Mounted { .. },
                    Some(target),
                    Some(MountArtifact::Owned { root }),
                ) if other != id && target.node == node => Some(AliasSource::Ready(other, root)),
                _ => None,
            })
            .unwrap_or(AliasSource::None)
    }

    fn resolves_as_proxy(&self, node: NodeId) -> bool {
        self.dom
            .attribute(node, "anchor")
            .and_then(|spec| AnchorSpec::parse(&spec).ok())
            .and_then(|anchor| anchor.resolve(&self.dom, node).ok())
            .is_some_and(|target| target.is_proxy)
    }

    /// Whether some other live instance is a proxy pointing at `node`.
    fn targeted_by_proxy(&self, id: ComponentId, node: NodeId) -> bool {
        self.instances.iter().any(|(other, inst)| {
            other != id
                && matches!(
                    inst.state,
                    LifecycleState::Mounting | LifecycleState::Mounted { .. }
                )
                && self
                    .dom
                    .attribute(inst.node, "anchor")
                    .and_then(|spec| AnchorSpec::parse(&spec).ok())
                    .is_some_and(|anchor| {
                        anchor.selects(&self.dom, node)
                            && anchor
                                .resolve(&self.dom, inst.node)
                                .is_ok_and(|target| target.is_proxy)
                    })
        })
    }

    /// Fetch template content. Failures degrade to empty content.
    fn load_template(&self, id: ComponentId, locator: Option<&str>) -> String {
        let Some(locator) = locator else {
            return String::new();
        };
        let result = match locator.strip_prefix('#') {
            Some(holder) => self
                .dom
                .query_by_id(holder)
                .and_then(|node| self.dom.get(node))
                .and_then(|data| data.text.clone())
                .ok_or_else(|| TemplateError::NotFound(locator.to_owned())),
            None => self.templates.get_template(locator),
        };
        result.unwrap_or_else(|err| {
            warn!(identity = %self.identity_of(id), locator, error = %err, "template unavailable, rendering empty");
            String::new()
        })
    }

    pub(crate) fn fail(&mut self, id: ComponentId, err: MountError) {
        let reason = match std::error::Error::source(&err) {
            Some(cause) => format!("{err}: {cause}"),
            None => err.to_string(),
        };
        error!(identity = %self.identity_of(id), error = %reason, "component failed to mount");
        if let Some(inst) = self.instances.get_mut(id) {
            inst.state = LifecycleState::Failed;
            inst.failure = Some(reason.clone());
        }
        self.journal.on_fail(id, reason);
    }

    // -----------------------------------------------------------------------
    // Ready
    // -----------------------------------------------------------------------

    /// Pass the ready checkpoint: hook, named function, broadcast, waiters.
    pub(crate) fn ready(&mut self, id: ComponentId) {
        if self.state_of(id) != Some(LifecycleState::Mounted { ready: false }) {
            return;
        }
        self.set_state(id, LifecycleState::Mounted { ready: true });
        self.journal.on_ready(id);

        self.with_behavior(id, |behavior, ctx| behavior.on_ready(ctx));
        if !self.is_live(id) {
            return;
        }

        let function = self
            .instances
            .get(id)
            .and_then(|inst| inst.config.as_ref())
            .and_then(|config| config.onready.clone());
        if let Some(name) = function {
            match self.functions.get(&name).cloned() {
                Some(f) => f(self, id),
                None => warn!(identity = %self.identity_of(id), function = %name, "unknown onready function"),
            }
        }
        if !self.is_live(id) {
            return;
        }

        let event = Event::new(self.config.ready_event.clone(), self.root())
            .with_detail(EventDetail::Component(id));
        self.dispatch(event);
        self.registry.notify_ready(id);
    }

    fn is_live(&self, id: ComponentId) -> bool {
        self.instances
            .get(id)
            .is_some_and(|inst| !inst.state.is_disconnected())
    }

    /// Run `f` with the instance's behavior taken out, so the hook can borrow
    /// the runtime mutably. The behavior is put back if the instance survived.
    fn with_behavior(&mut self, id: ComponentId, f: impl FnOnce(&mut dyn Component, &mut Context<'_>)) {
        let Some(inst) = self.instances.get_mut(id) else { return };
        let node = inst.node;
        let Some(mut behavior) = inst.behavior.take() else { return };
        {
            let mut ctx = Context {
                runtime: self,
                id,
                node,
            };
            f(behavior.as_mut(), &mut ctx);
        }
        if let Some(inst) = self.instances.get_mut(id) {
            inst.behavior = Some(behavior);
        }
    }

    // -----------------------------------------------------------------------
    // Attributes
    // -----------------------------------------------------------------------

    /// Record an observed attribute write for the next flush.
    pub(crate) fn queue_attribute(&mut self, id: ComponentId, name: &str, old: Option<String>, new: Option<String>) {
        let Some(inst) = self.instances.get_mut(id) else { return };
        if inst.state.is_disconnected() || !inst.observes(name) {
            return;
        }
        match inst.pending_attributes.iter_mut().find(|p| p.name == name) {
            Some(pending) => pending.new = new,
            None => inst.pending_attributes.push(PendingAttribute {
                name: name.to_owned(),
                old,
                new,
            }),
        }
        self.tasks.next_paint(Task::FlushAttributes(id));
    }

    /// Forward one callback per batched attribute.
    pub(crate) fn flush_attributes(&mut self, id: ComponentId) {
        let Some(inst) = self.instances.get_mut(id) else { return };
        if inst.state.is_disconnected() {
            return;
        }
        let batch = std::mem::take(&mut inst.pending_attributes);
        for change in batch {
            self.with_behavior(id, |behavior, ctx| {
                behavior.attribute_callback(ctx, &change.name, change.old.as_deref(), change.new.as_deref());
            });
        }
    }

    /// Move the registry entry to the identity now in the `id` attribute.
    pub(crate) fn rekey(&mut self, id: ComponentId, identity: Option<String>) {
        let Some(identity) = identity.filter(|i| !i.is_empty()) else {
            return;
        };
        if !self.is_live(id) || self.registry.entry(id).is_none() {
            return;
        }
        match self.registry.rekey(id, &identity) {
            Ok(()) => {
                if let Some(inst) = self.instances.get_mut(id) {
                    inst.identity = identity;
                }
            }
            Err(err) => warn!(identity = %self.identity_of(id), error = %err, "identity change ignored"),
        }
    }

    /// Hide the instance's element when it asks for the other orientation.
    pub(crate) fn apply_orientation(&mut self, id: ComponentId) {
        let Some(inst) = self.instances.get(id) else { return };
        let node = inst.node;
        let current = self.config.environment.orientation;
        if let Some(data) = self.dom.get_mut(node) {
            let visible = requested_orientation(data).map_or(true, |wanted| wanted == current);
            data.visible = visible;
        }
    }

    // -----------------------------------------------------------------------
    // Disconnect
    // -----------------------------------------------------------------------

    /// Tear an instance down. Safe at any point of the lifecycle, and again.
    pub(crate) fn disconnect(&mut self, id: ComponentId) {
        let Some(inst) = self.instances.get_mut(id) else { return };
        let was = inst.state;
        let node = inst.node;
        inst.state = LifecycleState::Disconnected;
        let scope = inst.scope.take();
        let artifact = inst.artifact.take();
        let identity = inst.identity.clone();

        self.registry.remove(id);
        self.listeners.detach_all(node);
        if let Some(scope) = scope {
            self.watchers.remove(&scope);
        }
        if let Some(MountArtifact::Owned { root }) = artifact {
            if root != node && self.dom.contains(root) {
                self.remove(root);
            }
        }

        let proxies: Vec<ComponentId> = self
            .instances
            .iter()
            .filter(|(_, other)| other.proxy_of() == Some(id))
            .map(|(other, _)| other)
            .collect();
        for proxy in proxies {
            if let Some(other) = self.instances.get_mut(proxy) {
                other.artifact = None;
            }
            debug!(identity = %self.identity_of(proxy), source = %identity, "aliased content went away");
            self.journal.on_alias_invalidated(proxy, id);
        }

        if was != LifecycleState::Disconnected {
            debug!(identity = %identity, "component disconnected");
            self.journal.on_disconnect(id);
        }
        self.instances.remove(id);
        self.bound.remove(&node);
    }
}

enum AliasSource {
    /// Nothing to alias; render own content at the remote location.
    None,
    /// The instance at the target has not mounted yet.
    Wait,
    Ready(ComponentId, NodeId),
}
