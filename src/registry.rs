//! Component registry: identity and name indexes over live instances.
//!
//! The registry never owns an instance. Entries are plain lookup records
//! keyed by [`ComponentId`], added when an instance passes its gates and
//! removed exactly once when it disconnects. Waiters subscribe to the ready
//! checkpoint through [`ComponentRegistry::wait_for`].

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use tokio::sync::oneshot;

use crate::component::ComponentId;
use crate::dom::NodeId;

/// Errors from registry mutation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("identity '{0}' is already registered")]
    DuplicateIdentity(String),
    #[error("instance is not registered")]
    NotRegistered,
}

/// Errors from [`ComponentRegistry::wait_for`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WaitError {
    #[error("no component matching '{key}' became ready within {timeout:?}")]
    TimedOut { key: String, timeout: Duration },
    #[error("registry dropped while waiting for '{key}'")]
    Cancelled { key: String },
}

/// Lookup record for one live instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryEntry {
    pub id: ComponentId,
    pub identity: String,
    pub name: String,
    pub node: NodeId,
    pub flat: bool,
}

/// Addresses an entry for removal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryKey {
    Id(ComponentId),
    Identity(String),
}

impl From<ComponentId> for RegistryKey {
    fn from(id: ComponentId) -> Self {
        Self::Id(id)
    }
}

impl From<&str> for RegistryKey {
    fn from(identity: &str) -> Self {
        Self::Identity(identity.to_owned())
    }
}

struct Waiter {
    key: String,
    tx: oneshot::Sender<ComponentId>,
}

/// Process-wide index of live instances.
#[derive(Default)]
pub struct ComponentRegistry {
    entries: HashMap<ComponentId, RegistryEntry>,
    by_identity: HashMap<String, ComponentId>,
    /// Name → instances in registration order.
    by_name: HashMap<String, Vec<ComponentId>>,
    by_node: HashMap<NodeId, ComponentId>,
    waiters: Vec<Waiter>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an instance. At most one live instance holds an identity.
    pub fn store(&mut self, entry: RegistryEntry) -> Result<(), RegistryError> {
        if self.by_identity.contains_key(&entry.identity) {
            return Err(RegistryError::DuplicateIdentity(entry.identity));
        }
        self.by_identity.insert(entry.identity.clone(), entry.id);
        self.by_name.entry(entry.name.clone()).or_default().push(entry.id);
        self.by_node.insert(entry.node, entry.id);
        self.entries.insert(entry.id, entry);
        Ok(())
    }

    /// Remove an entry by id or identity. Removing twice returns `None`.
    pub fn remove(&mut self, key: impl Into<RegistryKey>) -> Option<RegistryEntry> {
        let id = match key.into() {
            RegistryKey::Id(id) => id,
            RegistryKey::Identity(identity) => *self.by_identity.get(&identity)?,
        };
        let entry = self.entries.remove(&id)?;
        self.by_identity.remove(&entry.identity);
        if let Some(ids) = self.by_name.get_mut(&entry.name) {
            ids.retain(|&other| other != id);
            if ids.is_empty() {
                self.by_name.remove(&entry.name);
            }
        }
        self.by_node.remove(&entry.node);
        Some(entry)
    }

    /// Look up the instance holding `identity`.
    pub fn get(&self, identity: &str) -> Option<ComponentId> {
        self.by_identity.get(identity).copied()
    }

    pub fn entry(&self, id: ComponentId) -> Option<&RegistryEntry> {
        self.entries.get(&id)
    }

    /// The instance bound to `node`, if registered.
    pub fn by_node(&self, node: NodeId) -> Option<ComponentId> {
        self.by_node.get(&node).copied()
    }

    /// Every instance registered under `name`, filtered by rendering strategy.
    pub fn find_all(&self, name: &str, include_flat: bool, include_isolated: bool) -> Vec<ComponentId> {
        self.by_name
            .get(name)
            .map(|ids| {
                ids.iter()
                    .copied()
                    .filter(|id| {
                        self.entries
                            .get(id)
                            .is_some_and(|e| if e.flat { include_flat } else { include_isolated })
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Move an entry to a new identity.
    pub fn rekey(&mut self, id: ComponentId, identity: &str) -> Result<(), RegistryError> {
        match self.by_identity.get(identity) {
            Some(&holder) if holder == id => return Ok(()),
            Some(_) => return Err(RegistryError::DuplicateIdentity(identity.to_owned())),
            None => {}
        }
        let entry = self.entries.get_mut(&id).ok_or(RegistryError::NotRegistered)?;
        self.by_identity.remove(&entry.identity);
        entry.identity = identity.to_owned();
        self.by_identity.insert(entry.identity.clone(), id);
        Ok(())
    }

    /// Record the rendering strategy chosen at mount time.
    pub fn set_flat(&mut self, id: ComponentId, flat: bool) {
        if let Some(entry) = self.entries.get_mut(&id) {
            entry.flat = flat;
        }
    }

    fn lookup(&self, key: &str) -> Option<ComponentId> {
        self.get(key).or_else(|| {
            self.by_name
                .get(&key.to_ascii_lowercase())
                .and_then(|ids| ids.first().copied())
        })
    }

    /// Wait for an instance whose identity or name is `key`.
    ///
    /// Resolves right away when a registered instance already matches,
    /// otherwise at the first matching ready notification. A zero `timeout`
    /// waits forever. The returned future does not borrow the registry.
    pub fn wait_for(
        &mut self,
        key: &str,
        timeout: Duration,
    ) -> impl Future<Output = Result<ComponentId, WaitError>> + 'static {
        let (tx, rx) = oneshot::channel();
        match self.lookup(key) {
            Some(id) => {
                let _ = tx.send(id);
            }
            None => {
                self.waiters.retain(|w| !w.tx.is_closed());
                self.waiters.push(Waiter {
                    key: key.to_owned(),
                    tx,
                });
            }
        }
        let key = key.to_owned();
        async move {
            let received = async {
                rx.await.map_err(|_| WaitError::Cancelled { key: key.clone() })
            };
            if timeout.is_zero() {
                received.await
            } else {
                match tokio::time::timeout(timeout, received).await {
                    Ok(result) => result,
                    Err(_) => Err(WaitError::TimedOut {
                        key: key.clone(),
                        timeout,
                    }),
                }
            }
        }
    }

    /// Resolve every waiter matching the instance that just became ready.
    ///
    /// Returns how many waiters were resolved.
    pub fn notify_ready(&mut self, id: ComponentId) -> usize {
        let Some(entry) = self.entries.get(&id) else {
            return 0;
        };
        let (identity, name) = (entry.identity.clone(), entry.name.clone());
        let mut resolved = 0;
        let mut remaining = Vec::with_capacity(self.waiters.len());
        for waiter in self.waiters.drain(..) {
            if waiter.key == identity || waiter.key.eq_ignore_ascii_case(&name) {
                if waiter.tx.send(id).is_ok() {
                    resolved += 1;
                }
            } else if !waiter.tx.is_closed() {
                remaining.push(waiter);
            }
        }
        self.waiters = remaining;
        resolved
    }

    /// Number of waiters still subscribed.
    pub fn pending_waiters(&self) -> usize {
        self.waiters.iter().filter(|w| !w.tx.is_closed()).count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
