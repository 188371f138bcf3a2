//! Client-side mirror of the registry.
//!
//! The mirror starts `Uninitialized`. Hydration loads the cached snapshot
//! straight into `Live` when there is one; otherwise it goes through
//! `Hydrating` while a one-shot fetch runs, then stores the result and goes
//! `Live`.
//!
//! Independently, every inbound message is passed to [`Mirror::apply`]:
//! `INIT` replaces the map and the cache wholesale, `SWITCH_UPDATE` merges
//! one entry. An `INIT` that lands while a fetch is in flight wins; the
//! fetched snapshot is discarded when it arrives.
//!
//! The mirror never changes a switch on its own. Toggling goes to the
//! server as a request and comes back as an update.

use std::future::Future;

use switchboard_types::{Message, Switch, SwitchMap};
use tracing::{debug, info, warn};

use crate::cache::MirrorCache;
use crate::error::ClientError;

/// Where the mirror is in its startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MirrorState {
    /// Nothing loaded yet.
    Uninitialized,
    /// A snapshot fetch is in flight.
    Hydrating,
    /// The map holds a baseline and tracks updates.
    Live,
}

/// Supplies a full snapshot for hydration.
pub trait SnapshotSource: Sync {
    /// Fetch every switch.
    fn fetch_snapshot(&self) -> impl Future<Output = Result<SwitchMap, ClientError>> + Send;
}

/// Local id-to-switch map backed by a durable cache.
#[derive(Debug)]
pub struct Mirror<K> {
    state: MirrorState,
    switches: SwitchMap,
    cache: K,
}

impl<K: MirrorCache> Mirror<K> {
    /// An uninitialized mirror over `cache`.
    pub const fn new(cache: K) -> Self {
        Self {
            state: MirrorState::Uninitialized,
            switches: SwitchMap::new(),
            cache,
        }
    }

    /// Current startup state.
    pub const fn state(&self) -> MirrorState {
        self.state
    }

    /// The local map.
    pub const fn switches(&self) -> &SwitchMap {
        &self.switches
    }

    /// One switch from the local map.
    pub fn get(&self, id: &str) -> Option<&Switch> {
        self.switches.get(id)
    }

    /// The backing cache.
    pub const fn cache(&self) -> &K {
        &self.cache
    }

    /// First half of hydration: returns `true` when a snapshot fetch is
    /// needed, having moved to `Hydrating`. A mirror that is already `Live`
    /// or finds a cached snapshot needs no fetch.
    ///
    /// The fetch itself runs without the mirror borrowed; hand its result to
    /// [`complete_hydration`](Self::complete_hydration).
    pub fn prepare_hydration(&mut self) -> bool {
        if self.state == MirrorState::Live || self.hydrate_from_cache() {
            return false;
        }
        self.begin_hydration();
        true
    }

    /// Load the cached snapshot, if any, and go `Live`. Returns whether it
    /// did. An unreadable cache counts as absent.
    pub fn hydrate_from_cache(&mut self) -> bool {
        match self.cache.load() {
            Ok(Some(switches)) => {
                info!(count = switches.len(), "mirror hydrated from cache");
                self.switches = switches;
                self.state = MirrorState::Live;
                true
            }
            Ok(None) => false,
            Err(e) => {
                warn!(error = %e, "ignoring unreadable mirror cache");
                false
            }
        }
    }

    /// Mark a snapshot fetch as in flight.
    pub fn begin_hydration(&mut self) {
        self.state = MirrorState::Hydrating;
    }

    /// Finish a fetch started with [`begin_hydration`](Self::begin_hydration).
    ///
    /// A snapshot is only taken if the mirror is still `Hydrating`.
    ///
    /// # Errors
    ///
    /// The fetch error, after reverting to `Uninitialized`.
    pub fn complete_hydration(
        &mut self,
        fetched: Result<SwitchMap, ClientError>,
    ) -> Result<(), ClientError> {
        match fetched {
            Ok(switches) if self.state == MirrorState::Hydrating => {
                info!(count = switches.len(), "mirror hydrated from server");
                self.switches = switches;
                self.persist();
                self.state = MirrorState::Live;
                Ok(())
            }
            Ok(_) => {
                debug!(state = ?self.state, "fetched snapshot superseded");
                Ok(())
            }
            Err(e) => {
                if self.state == MirrorState::Hydrating {
                    self.state = MirrorState::Uninitialized;
                }
                Err(e)
            }
        }
    }

    /// Reconcile one inbound message.
    pub fn apply(&mut self, message: &Message) {
        match message {
            Message::Init { switches } => {
                debug!(count = switches.len(), "applying INIT");
                self.switches.clone_from(switches);
                self.state = MirrorState::Live;
                self.persist();
            }
            Message::Update { switch } => {
                debug!(switch_id = %switch.id, status = %switch.status, "applying SWITCH_UPDATE");
                self.switches.insert(switch.id.clone(), switch.clone());
                self.persist();
            }
            Message::ToggleRequest { switch_id } => {
                debug!(%switch_id, "ignoring client-only message");
            }
        }
    }

    fn persist(&self) {
        if let Err(e) = self.cache.store(&self.switches) {
            warn!(error = %e, "failed to write mirror cache");
        }
    }
}
