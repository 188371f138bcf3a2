//! Authoritative switch registry.
//!
//! [`Registry`] is the only place switch state is mutated. It is created
//! once with the provisioning set and lives for the process lifetime; no
//! switch is ever added or removed afterwards.
//!
//! # Mutation observers
//!
//! Every successful [`toggle`](Registry::toggle) or
//! [`set_status`](Registry::set_status) calls each subscribed observer with
//! the updated [`Switch`] *while the write lock is still held*. Mutation and
//! notification therefore form one step: two mutations never interleave,
//! and observers see updates in exactly the order they were applied.
//! Observers must not call back into a mutating method of the same
//! registry.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use switchboard_types::{InvalidStatus, Switch, SwitchId, SwitchMap, SwitchStatus, index_by_id};
use tracing::{debug, info};

/// Callback invoked with the new value of a mutated switch.
pub type MutationObserver = Box<dyn Fn(&Switch) + Send + Sync>;

/// Errors returned by registry operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// No switch with this id exists.
    #[error("switch not found: {0}")]
    NotFound(SwitchId),

    /// The requested status is neither `ON` nor `OFF`.
    #[error(transparent)]
    InvalidStatus(#[from] InvalidStatus),
}

/// Authoritative id-to-switch store with mutation observers.
pub struct Registry {
    switches: RwLock<SwitchMap>,
    observers: RwLock<Vec<MutationObserver>>,
}

impl Registry {
    /// Create a registry holding the given provisioning set.
    pub fn new(switches: impl IntoIterator<Item = Switch>) -> Self {
        Self {
            switches: RwLock::new(index_by_id(switches)),
            observers: RwLock::new(Vec::new()),
        }
    }

    /// Subscribe to mutation notifications.
    pub fn subscribe(&self, observer: impl Fn(&Switch) + Send + Sync + 'static) {
        self.observers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Box::new(observer));
    }

    /// All current switches. Order is by id but carries no meaning.
    pub fn list(&self) -> Vec<Switch> {
        self.read().values().cloned().collect()
    }

    /// Run `f` against the current map while holding the read lock.
    ///
    /// No mutation (and therefore no notification) can happen until `f`
    /// returns, which lets a caller pair a snapshot with a side effect
    /// atomically.
    pub fn with_snapshot<R>(&self, f: impl FnOnce(&SwitchMap) -> R) -> R {
        f(&self.read())
    }

    /// Look up one switch.
    ///
    /// # Errors
    ///
    /// [`RegistryError::NotFound`] if `id` is unknown.
    pub fn get(&self, id: &str) -> Result<Switch, RegistryError> {
        self.read()
            .get(id)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(SwitchId::from(id)))
    }

    /// Flip a switch ON <-> OFF and notify observers.
    ///
    /// # Errors
    ///
    /// [`RegistryError::NotFound`] if `id` is unknown.
    pub fn toggle(&self, id: &str) -> Result<Switch, RegistryError> {
        self.mutate(id, |switch| switch.status = switch.status.toggled())
    }

    /// Set a switch to an explicit status given in wire spelling.
    ///
    /// The id is checked before the status, so an unknown id with a bad
    /// status reports `NotFound`.
    ///
    /// # Errors
    ///
    /// [`RegistryError::NotFound`] if `id` is unknown,
    /// [`RegistryError::InvalidStatus`] if `status` is not `ON`/`OFF`.
    pub fn set_status(&self, id: &str, status: &str) -> Result<Switch, RegistryError> {
        let mut switches = self.write();
        if !switches.contains_key(id) {
            return Err(RegistryError::NotFound(SwitchId::from(id)));
        }
        let status: SwitchStatus = status.parse()?;
        Self::apply(&mut switches, &self.observers, id, |switch| {
            switch.status = status;
        })
    }

    fn mutate(&self, id: &str, change: impl FnOnce(&mut Switch)) -> Result<Switch, RegistryError> {
        let mut switches = self.write();
        Self::apply(&mut switches, &self.observers, id, change)
    }

    /// Apply `change` and notify observers under the caller's write guard.
    fn apply(
        switches: &mut RwLockWriteGuard<'_, SwitchMap>,
        observers: &RwLock<Vec<MutationObserver>>,
        id: &str,
        change: impl FnOnce(&mut Switch),
    ) -> Result<Switch, RegistryError> {
        let switch = switches
            .get_mut(id)
            .ok_or_else(|| RegistryError::NotFound(SwitchId::from(id)))?;
        change(switch);
        let updated = switch.clone();

        info!(switch_id = %updated.id, status = %updated.status, "switch updated");

        let observers = observers.read().unwrap_or_else(PoisonError::into_inner);
        for observer in observers.iter() {
            observer(&updated);
        }
        debug!(switch_id = %updated.id, observers = observers.len(), "mutation observers notified");

        Ok(updated)
    }

    fn read(&self) -> RwLockReadGuard<'_, SwitchMap> {
        self.switches.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SwitchMap> {
        self.switches.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl core::fmt::Debug for Registry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Registry")
            .field("switches", &*self.read())
            .finish_non_exhaustive()
    }
}
