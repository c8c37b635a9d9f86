//! Listener attachment and event dispatch.

use tracing::warn;

use crate::dom::NodeId;
use crate::event::{composed_path, Callback, Event};

use super::Runtime;

impl Runtime {
    /// Subscribe `callback` to `event` on `target` on behalf of `owner`.
    ///
    /// Returns `false` if the target is no longer in the tree. Attaching an
    /// identical tuple twice keeps a single subscription and returns `true`.
    pub fn attach(
        &mut self,
        owner: NodeId,
        target: NodeId,
        event: &str,
        callback: &Callback,
        once: bool,
    ) -> bool {
        self.listeners
            .attach(&self.dom, owner, target, event, callback, once)
    }

    /// Remove `callback` (or every callback, with `None`) from
    /// `(owner, target, event)`.
    pub fn detach(&mut self, owner: NodeId, target: NodeId, event: &str, callback: Option<&Callback>) {
        self.listeners.detach(owner, target, event, callback);
    }

    /// Remove every subscription `owner` holds.
    pub fn detach_all(&mut self, owner: NodeId) {
        self.listeners.detach_all(owner);
    }

    /// Number of live subscriptions held by `owner`.
    pub fn listener_count(&self, owner: NodeId) -> usize {
        self.listeners.count_for(owner)
    }

    /// Deliver `event` along its composed path. Returns how many listeners
    /// ran.
    ///
    /// A listener that fails is logged and the rest still run. Listeners
    /// detached by an earlier listener in the same dispatch are skipped.
    pub fn dispatch(&mut self, event: Event) -> usize {
        let name = event.name().to_owned();
        let mut fired = 0;
        for node in composed_path(&self.dom, event.target()) {
            for handle in self.listeners.listeners(node, &name) {
                if !self.listeners.is_live(&handle, node, &name) {
                    continue;
                }
                let result = (handle.callback)(self, &event);
                fired += 1;
                if handle.once {
                    self.listeners.detach_seq(handle.owner, node, &name, handle.seq);
                }
                if let Err(err) = result {
                    warn!(event = %name, error = %err, "event listener failed");
                }
            }
            if event.is_propagation_stopped() {
                break;
            }
        }
        fired
    }
}
