//! The mirror client facade.
//!
//! [`SwitchClient`] owns a [`Mirror`] and a [`ReconnectManager`] and wires
//! the mirror in as a listener, so every inbound message reconciles the
//! local map. The transport and cache are injected.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use switchboard_types::{Message, SwitchId, SwitchMap};
use tokio::sync::watch;

use crate::cache::MirrorCache;
use crate::connector::Connector;
use crate::error::ClientError;
use crate::listeners::ListenerHandle;
use crate::mirror::{Mirror, MirrorState, SnapshotSource};
use crate::reconnect::{ConnectionState, ReconnectManager};

/// Live local view of a Switchboard server.
pub struct SwitchClient<C: Connector, K: MirrorCache + 'static> {
    mirror: Arc<Mutex<Mirror<K>>>,
    link: ReconnectManager<C>,
    _reconcile: ListenerHandle,
}

impl<C: Connector, K: MirrorCache + 'static> SwitchClient<C, K> {
    /// Client over `connector` and `cache`. Call [`start`](Self::start) to
    /// go live.
    pub fn new(connector: C, cache: K, reconnect_delay: Duration) -> Self {
        let mirror = Arc::new(Mutex::new(Mirror::new(cache)));
        let link = ReconnectManager::new(connector, reconnect_delay);

        let sink = Arc::clone(&mirror);
        let reconcile = link.add_listener(move |message| {
            sink.lock()
                .unwrap_or_else(PoisonError::into_inner)
                .apply(message);
        });

        Self {
            mirror,
            link,
            _reconcile: reconcile,
        }
    }

    /// Open the observer link and hydrate the mirror.
    ///
    /// The link stays up (and keeps retrying) even when hydration fails;
    /// the first `INIT` will populate the mirror.
    ///
    /// # Errors
    ///
    /// The snapshot fetch error when there is no cache to fall back on.
    pub async fn start<S: SnapshotSource>(&self, source: &S) -> Result<(), ClientError> {
        self.link.connect();

        if !self.mirror().prepare_hydration() {
            return Ok(());
        }
        let fetched = source.fetch_snapshot().await;
        self.mirror().complete_hydration(fetched)
    }

    /// Request a toggle. The local map changes only when the resulting
    /// update arrives.
    ///
    /// # Errors
    ///
    /// [`ClientError::NotConnected`] when the link is down.
    pub async fn toggle(&self, switch_id: impl Into<SwitchId>) -> Result<(), ClientError> {
        self.link.send_toggle(switch_id).await
    }

    /// Copy of the local map.
    pub fn switches(&self) -> SwitchMap {
        self.mirror().switches().clone()
    }

    /// Mirror startup state.
    pub fn mirror_state(&self) -> MirrorState {
        self.mirror().state()
    }

    /// Observer link state.
    pub fn state(&self) -> ConnectionState {
        self.link.state()
    }

    /// Subscribe to link state changes.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.link.watch_state()
    }

    /// Subscribe to inbound messages alongside the mirror.
    pub fn add_listener(
        &self,
        listener: impl Fn(&Message) + Send + Sync + 'static,
    ) -> ListenerHandle {
        self.link.add_listener(listener)
    }

    /// The underlying link manager.
    pub const fn link(&self) -> &ReconnectManager<C> {
        &self.link
    }

    /// Close the link and stop retrying.
    pub fn shutdown(&self) {
        self.link.disconnect();
    }

    fn mirror(&self) -> MutexGuard<'_, Mirror<K>> {
        self.mirror.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<C: Connector, K: MirrorCache + 'static> std::fmt::Debug for SwitchClient<C, K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SwitchClient")
            .field("link", &self.link)
            .field("mirror_state", &self.mirror_state())
            .finish_non_exhaustive()
    }
}
