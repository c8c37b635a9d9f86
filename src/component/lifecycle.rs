//! Lifecycle states and the journal of transitions.
//!
//! The `LifecycleJournal` records which instances currently have content
//! mounted and accumulates lifecycle events that can be drained by the host
//! application or by tests.

use std::collections::HashSet;
use std::fmt;

use super::gate::Gate;
use super::instance::ComponentId;

// ---------------------------------------------------------------------------
// LifecycleState
// ---------------------------------------------------------------------------

/// Where an instance is in its lifecycle.
///
/// ```text
/// Unmounted → Gated → Mounting → Mounted{ready: false} → Mounted{ready: true}
///     │                  │                 any state ───────→ Disconnected
///     └─ gate fails ─→ Disconnected        └─ resolve fails ─→ Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Unmounted,
    Gated,
    /// Registered; the mount is queued for a later frame.
    Mounting,
    Mounted { ready: bool },
    /// Mounting raised. The instance stays registered but never renders.
    Failed,
    /// Terminal.
    Disconnected,
}

impl LifecycleState {
    pub fn is_mounted(self) -> bool {
        matches!(self, Self::Mounted { .. })
    }

    pub fn is_ready(self) -> bool {
        self == Self::Mounted { ready: true }
    }

    pub fn is_disconnected(self) -> bool {
        self == Self::Disconnected
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unmounted => f.write_str("unmounted"),
            Self::Gated => f.write_str("gated"),
            Self::Mounting => f.write_str("mounting"),
            Self::Mounted { ready: false } => f.write_str("mounted"),
            Self::Mounted { ready: true } => f.write_str("ready"),
            Self::Failed => f.write_str("failed"),
            Self::Disconnected => f.write_str("disconnected"),
        }
    }
}

// ---------------------------------------------------------------------------
// LifecycleEvent
// ---------------------------------------------------------------------------

/// Events that occur during the component lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// Gates passed; the instance is registered and its mount is queued.
    Connected { id: ComponentId },
    /// A gate failed; the instance removes itself without mounting.
    Rejected { id: ComponentId, gate: Gate },
    /// Content was materialized.
    Mounted { id: ComponentId },
    /// The ready checkpoint passed.
    Ready { id: ComponentId },
    /// Mounting raised; the instance stays unmounted.
    Failed { id: ComponentId, reason: String },
    /// The instance a proxy aliased went away.
    AliasInvalidated { id: ComponentId, source: ComponentId },
    /// The instance left the tree.
    Disconnected { id: ComponentId },
}

impl LifecycleEvent {
    /// The instance this event concerns.
    pub fn id(&self) -> ComponentId {
        match self {
            Self::Connected { id }
            | Self::Rejected { id, .. }
            | Self::Mounted { id }
            | Self::Ready { id }
            | Self::Failed { id, .. }
            | Self::AliasInvalidated { id, .. }
            | Self::Disconnected { id } => *id,
        }
    }
}

// ---------------------------------------------------------------------------
// LifecycleJournal
// ---------------------------------------------------------------------------

/// Tracks which instances have content mounted and accumulates events.
#[derive(Debug, Default)]
pub struct LifecycleJournal {
    /// Instances with materialized content.
    mounted: HashSet<ComponentId>,
    /// Pending lifecycle events, in order of occurrence.
    pending: Vec<LifecycleEvent>,
}

impl LifecycleJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_connect(&mut self, id: ComponentId) {
        self.pending.push(LifecycleEvent::Connected { id });
    }

    pub fn on_reject(&mut self, id: ComponentId, gate: Gate) {
        self.pending.push(LifecycleEvent::Rejected { id, gate });
    }

    /// Record that content was materialized. A repeated mount is a no-op.
    pub fn on_mount(&mut self, id: ComponentId) {
        if self.mounted.insert(id) {
            self.pending.push(LifecycleEvent::Mounted { id });
        }
    }

    /// Record the ready checkpoint. Ignored for instances that never mounted.
    pub fn on_ready(&mut self, id: ComponentId) {
        if self.mounted.contains(&id) {
            self.pending.push(LifecycleEvent::Ready { id });
        }
    }

    pub fn on_fail(&mut self, id: ComponentId, reason: impl Into<String>) {
        self.pending.push(LifecycleEvent::Failed {
            id,
            reason: reason.into(),
        });
    }

    pub fn on_alias_invalidated(&mut self, id: ComponentId, source: ComponentId) {
        self.pending.push(LifecycleEvent::AliasInvalidated { id, source });
    }

    pub fn on_disconnect(&mut self, id: ComponentId) {
        self.mounted.remove(&id);
        self.pending.push(LifecycleEvent::Disconnected { id });
    }

    /// Whether an instance currently has content mounted.
    pub fn is_mounted(&self, id: ComponentId) -> bool {
        self.mounted.contains(&id)
    }

    /// The number of instances with content mounted.
    pub fn mounted_count(&self) -> usize {
        self.mounted.len()
    }

    /// Drain and return all pending lifecycle events.
    pub fn pending_events(&mut self) -> Vec<LifecycleEvent> {
        std::mem::take(&mut self.pending)
    }

    /// Whether there are any pending events.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}

// ===========================================================================
// Tests
// ===========================================================================
