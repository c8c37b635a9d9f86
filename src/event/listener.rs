//! Event attachment registry.
//!
//! Every subscription is owned by a node (usually a component's element) and
//! keyed by `(target, event)` plus the identity of the callback. Attaching the
//! same tuple twice is a no-op. Owners are the unit of cleanup: when a
//! component disconnects, [`ListenerRegistry::detach_all`] drops everything it
//! attached, wherever it attached it.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use super::event::Event;
use crate::dom::{Dom, NodeId};
use crate::runtime::Runtime;

/// What a listener returns. Errors are logged by the dispatcher and never
/// stop delivery to the remaining listeners.
pub type CallbackResult = Result<(), Box<dyn std::error::Error>>;

/// A shared listener callback. Identity is the allocation, so clones of the
/// same `Rc` are the same callback.
pub type Callback = Rc<dyn Fn(&mut Runtime, &Event) -> CallbackResult>;

fn callback_identity(callback: &Callback) -> usize {
    Rc::as_ptr(callback) as *const () as usize
}

/// `(target, event)` half of a listener key; the owner is the outer map.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListenerKey {
    pub target: NodeId,
    pub event: String,
}

struct Subscription {
    seq: u64,
    callback: Callback,
    identity: usize,
    once: bool,
}

/// A snapshot of one live subscription, in attach order.
#[derive(Clone)]
pub struct ListenerHandle {
    pub owner: NodeId,
    pub seq: u64,
    pub callback: Callback,
    pub once: bool,
}

impl std::fmt::Debug for ListenerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerHandle")
            .field("owner", &self.owner)
            .field("seq", &self.seq)
            .field("once", &self.once)
            .finish()
    }
}

/// Deduplicating table of live subscriptions.
#[derive(Default)]
pub struct ListenerRegistry {
    owners: HashMap<NodeId, HashMap<ListenerKey, Vec<Subscription>>>,
    /// Target → owners holding at least one subscription on it.
    targets: HashMap<NodeId, HashSet<NodeId>>,
    next_seq: u64,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe `callback` to `event` on `target` on behalf of `owner`.
    ///
    /// Returns `false` when the target is no longer in the tree. Re-attaching
    /// an identical `(owner, target, event, callback)` returns `true` and
    /// leaves the existing subscription alone.
    pub fn attach(
        &mut self,
        dom: &Dom,
        owner: NodeId,
        target: NodeId,
        event: &str,
        callback: &Callback,
        once: bool,
    ) -> bool {
        if !dom.contains(target) {
            return false;
        }
        let identity = callback_identity(callback);
        let key = ListenerKey {
            target,
            event: event.to_owned(),
        };
        let subs = self.owners.entry(owner).or_default().entry(key).or_default();
        if subs.iter().any(|s| s.identity == identity) {
            return true;
        }
        self.next_seq += 1;
        subs.push(Subscription {
            seq: self.next_seq,
            callback: Rc::clone(callback),
            identity,
            once,
        });
        self.targets.entry(target).or_default().insert(owner);
        true
    }

    /// Remove one callback, or every callback when `callback` is `None`, from
    /// `(owner, target, event)`. Returns how many subscriptions were dropped.
    pub fn detach(
        &mut self,
        owner: NodeId,
        target: NodeId,
        event: &str,
        callback: Option<&Callback>,
    ) -> usize {
        let identity = callback.map(callback_identity);
        self.retain_in(owner, target, event, |s| {
            identity.is_some_and(|id| s.identity != id)
        })
    }

    /// Drop a single subscription by sequence number. Used for `once`
    /// listeners after they fire.
    pub(crate) fn detach_seq(&mut self, owner: NodeId, target: NodeId, event: &str, seq: u64) -> bool {
        self.retain_in(owner, target, event, |s| s.seq != seq) > 0
    }

    fn retain_in(
        &mut self,
        owner: NodeId,
        target: NodeId,
        event: &str,
        keep: impl Fn(&Subscription) -> bool,
    ) -> usize {
        let key = ListenerKey {
            target,
            event: event.to_owned(),
        };
        let Some(by_key) = self.owners.get_mut(&owner) else {
            return 0;
        };
        let Some(subs) = by_key.get_mut(&key) else {
            return 0;
        };
        let before = subs.len();
        subs.retain(|s| keep(s));
        let removed = before - subs.len();
        if subs.is_empty() {
            by_key.remove(&key);
        }
        let owner_keeps_target = by_key.keys().any(|k| k.target == target);
        if by_key.is_empty() {
            self.owners.remove(&owner);
        }
        if !owner_keeps_target {
            self.unindex(target, owner);
        }
        removed
    }

    fn unindex(&mut self, target: NodeId, owner: NodeId) {
        if let Some(owners) = self.targets.get_mut(&target) {
            owners.remove(&owner);
            if owners.is_empty() {
                self.targets.remove(&target);
            }
        }
    }

    /// Drop every subscription `owner` holds, across all targets and events.
    pub fn detach_all(&mut self, owner: NodeId) -> usize {
        let Some(by_key) = self.owners.remove(&owner) else {
            return 0;
        };
        let mut removed = 0;
        for (key, subs) in by_key {
            removed += subs.len();
            self.unindex(key.target, owner);
        }
        removed
    }

    /// Drop every subscription on a target that left the tree.
    pub fn detach_target(&mut self, target: NodeId) -> usize {
        let Some(owners) = self.targets.remove(&target) else {
            return 0;
        };
        let mut removed = 0;
        for owner in owners {
            if let Some(by_key) = self.owners.get_mut(&owner) {
                by_key.retain(|key, subs| {
                    if key.target == target {
                        removed += subs.len();
                        false
                    } else {
                        true
                    }
                });
                if by_key.is_empty() {
                    self.owners.remove(&owner);
                }
            }
        }
        removed
    }

    /// Live subscriptions for `event` on `target`, in attach order.
    pub fn listeners(&self, target: NodeId, event: &str) -> Vec<ListenerHandle> {
        let Some(owners) = self.targets.get(&target) else {
            return Vec::new();
        };
        let key = ListenerKey {
            target,
            event: event.to_owned(),
        };
        let mut handles: Vec<ListenerHandle> = owners
            .iter()
            .filter_map(|&owner| {
                let subs = self.owners.get(&owner)?.get(&key)?;
                Some(subs.iter().map(move |s| ListenerHandle {
                    owner,
                    seq: s.seq,
                    callback: Rc::clone(&s.callback),
                    once: s.once,
                }))
            })
            .flatten()
            .collect();
        handles.sort_by_key(|h| h.seq);
        handles
    }

    /// Whether a subscription snapshot is still attached.
    pub fn is_live(&self, handle: &ListenerHandle, target: NodeId, event: &str) -> bool {
        let key = ListenerKey {
            target,
            event: event.to_owned(),
        };
        self.owners
            .get(&handle.owner)
            .and_then(|by_key| by_key.get(&key))
            .is_some_and(|subs| subs.iter().any(|s| s.seq == handle.seq))
    }

    /// Number of subscriptions `owner` holds.
    pub fn count_for(&self, owner: NodeId) -> usize {
        self.owners
            .get(&owner)
            .map(|by_key| by_key.values().map(Vec::len).sum())
            .unwrap_or(0)
    }

    /// Whether any owner holds subscriptions on `target`.
    pub fn has_target(&self, target: NodeId) -> bool {
        self.targets.contains_key(&target)
    }

    /// Total live subscriptions.
    pub fn len(&self) -> usize {
        self.owners
            .values()
            .flat_map(|by_key| by_key.values())
            .map(Vec::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::NodeData;

    fn noop() -> Callback {
        Rc::new(|_: &mut Runtime, _: &Event| -> CallbackResult { Ok(()) })
    }

    fn setup() -> (Dom, NodeId, NodeId, NodeId) {
        let mut dom = Dom::new();
        let root = dom.insert(NodeData::new("document"));
        let owner = dom.insert_child(root, NodeData::new("x-form")).unwrap();
        let button = dom.insert_child(owner, NodeData::new("button")).unwrap();
        (dom, root, owner, button)
    }

    // ── Attach ───────────────────────────────────────────────────────

    #[test]
    fn attach_twice_is_one_subscription() {
        let (dom, _root, owner, button) = setup();
        let mut reg = ListenerRegistry::new();
        let cb = noop();

        assert!(reg.attach(&dom, owner, button, "click", &cb, false));
        assert!(reg.attach(&dom, owner, button, "click", &Rc::clone(&cb), false));
        assert_eq!(reg.count_for(owner), 1);
        assert_eq!(reg.listeners(button, "click").len(), 1);

        assert_eq!(reg.detach(owner, button, "click", Some(&cb)), 1);
        assert!(reg.is_empty());
        assert!(!reg.has_target(button));
    }

    #[test]
    fn distinct_callbacks_both_subscribe() {
        let (dom, _root, owner, button) = setup();
        let mut reg = ListenerRegistry::new();
        let (a, b) = (noop(), noop());
        reg.attach(&dom, owner, button, "click", &a, false);
        reg.attach(&dom, owner, button, "click", &b, false);
        assert_eq!(reg.count_for(owner), 2);
    }

    #[test]
    fn attach_to_disposed_target_is_rejected() {
        let (mut dom, _root, owner, button) = setup();
        let mut reg = ListenerRegistry::new();
        dom.remove(button);
        assert!(!reg.attach(&dom, owner, button, "click", &noop(), false));
        assert!(reg.is_empty());
    }

    // ── Detach ───────────────────────────────────────────────────────

    #[test]
    fn detach_without_callback_removes_whole_tuple() {
        let (dom, root, owner, button) = setup();
        let mut reg = ListenerRegistry::new();
        reg.attach(&dom, owner, button, "click", &noop(), false);
        reg.attach(&dom, owner, button, "click", &noop(), true);
        reg.attach(&dom, owner, button, "focus", &noop(), false);
        reg.attach(&dom, owner, root, "click", &noop(), false);

        assert_eq!(reg.detach(owner, button, "click", None), 2);
        assert_eq!(reg.count_for(owner), 2);
        assert!(reg.has_target(button));
    }

    #[test]
    fn detach_unknown_is_noop() {
        let (_dom, _root, owner, button) = setup();
        let mut reg = ListenerRegistry::new();
        assert_eq!(reg.detach(owner, button, "click", None), 0);
    }

    #[test]
    fn detach_all_prunes_everything() {
        let (dom, root, owner, button) = setup();
        let mut reg = ListenerRegistry::new();
        reg.attach(&dom, owner, button, "click", &noop(), false);
        reg.attach(&dom, owner, root, "component-ready", &noop(), false);
        reg.attach(&dom, root, button, "click", &noop(), false);

        assert_eq!(reg.detach_all(owner), 2);
        assert_eq!(reg.count_for(owner), 0);
        assert!(!reg.has_target(root));
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.detach_all(owner), 0);
    }

    #[test]
    fn detach_target_drops_all_owners() {
        let (dom, root, owner, button) = setup();
        let mut reg = ListenerRegistry::new();
        reg.attach(&dom, owner, button, "click", &noop(), false);
        reg.attach(&dom, root, button, "click", &noop(), false);
        reg.attach(&dom, owner, root, "click", &noop(), false);

        assert_eq!(reg.detach_target(button), 2);
        assert!(reg.listeners(button, "click").is_empty());
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.count_for(root), 0);
    }

    // ── Listing ──────────────────────────────────────────────────────

    #[test]
    fn listeners_in_attach_order_across_owners() {
        let (dom, root, owner, button) = setup();
        let mut reg = ListenerRegistry::new();
        reg.attach(&dom, owner, button, "click", &noop(), false);
        reg.attach(&dom, root, button, "click", &noop(), true);
        reg.attach(&dom, owner, button, "click", &noop(), false);

        let handles = reg.listeners(button, "click");
        let owners: Vec<NodeId> = handles.iter().map(|h| h.owner).collect();
        assert_eq!(owners, vec![owner, root, owner]);
        assert!(handles[1].once);
        assert!(handles.windows(2).all(|w| w[0].seq < w[1].seq));
    }

    #[test]
    fn handle_goes_stale_after_detach() {
        let (dom, _root, owner, button) = setup();
        let mut reg = ListenerRegistry::new();
        reg.attach(&dom, owner, button, "click", &noop(), true);
        let handle = reg.listeners(button, "click").remove(0);
        assert!(reg.is_live(&handle, button, "click"));
        assert!(reg.detach_seq(owner, button, "click", handle.seq));
        assert!(!reg.is_live(&handle, button, "click"));
        assert!(reg.is_empty());
    }
}
