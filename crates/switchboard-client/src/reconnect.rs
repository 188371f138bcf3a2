//! Reconnecting observer link.
//!
//! [`ReconnectManager`] owns at most one live [`Link`] and moves through
//! three states:
//!
//! ```text
//!            connect()               link up
//! Disconnected --------> Connecting ---------> Connected
//!      ^                     |                     |
//!      |   connect failed    |      link closed    |
//!      +---------------------+---------------------+
//!                  (retry armed after the delay)
//! ```
//!
//! Every drop back to `Disconnected` arms exactly one retry timer,
//! replacing any timer already pending, so retries never overlap. Reaching
//! `Connected` cancels the pending timer. [`ReconnectManager::disconnect`]
//! tears everything down and arms nothing.
//!
//! Inbound frames are decoded and fanned out to the listeners; frames that
//! do not decode are logged and skipped.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use switchboard_types::{Message, SwitchId};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::connector::{Connector, Link};
use crate::error::ClientError;
use crate::listeners::{ListenerHandle, ListenerRegistry};

/// Observer link state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// No link and no attempt in flight.
    Disconnected,
    /// A connect attempt is in flight.
    Connecting,
    /// A link is up.
    Connected,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        })
    }
}

/// Mutable link bookkeeping, guarded by one lock.
///
/// `epoch` advances on every [`ReconnectManager::disconnect`]. Sessions and
/// retry timers remember the epoch they were started in and do nothing once
/// it has moved on.
#[derive(Debug, Default)]
struct Control {
    epoch: u64,
    in_flight: bool,
    outbound: Option<mpsc::Sender<String>>,
    session: Option<JoinHandle<()>>,
    retry: Option<JoinHandle<()>>,
}

struct Inner<C> {
    connector: C,
    delay: Duration,
    state: watch::Sender<ConnectionState>,
    control: Mutex<Control>,
    listeners: Arc<ListenerRegistry>,
}

impl<C: Connector> Inner<C> {
    fn lock(&self) -> MutexGuard<'_, Control> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, next: ConnectionState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            debug!(from = %previous, to = %next, "link state changed");
        }
    }

    /// Start a session unless one is in flight. `expected` pins the epoch a
    /// retry timer was armed in.
    fn start(self: &Arc<Self>, expected: Option<u64>) {
        let mut control = self.lock();
        if expected.is_some_and(|epoch| epoch != control.epoch) {
            return;
        }
        if control.in_flight {
            debug!("connect ignored, link already connecting or connected");
            return;
        }
        control.in_flight = true;
        self.set_state(ConnectionState::Connecting);

        let epoch = control.epoch;
        let this = Arc::clone(self);
        control.session = Some(tokio::spawn(async move { this.run_session(epoch).await }));
    }

    async fn run_session(self: Arc<Self>, epoch: u64) {
        let Link {
            outbound,
            mut inbound,
        } = match self.connector.connect().await {
            Ok(link) => link,
            Err(e) => {
                warn!(error = %e, "observer connect failed");
                self.on_disconnected(epoch);
                return;
            }
        };

        {
            let mut control = self.lock();
            if control.epoch != epoch {
                return;
            }
            control.outbound = Some(outbound);
            if let Some(retry) = control.retry.take() {
                retry.abort();
            }
            self.set_state(ConnectionState::Connected);
        }
        info!("observer link connected");

        while let Some(text) = inbound.recv().await {
            match switchboard_types::decode(text.as_bytes()) {
                Ok(message) => self.listeners.notify(&message),
                Err(e) => warn!(error = %e, "ignoring undecodable message"),
            }
        }

        info!("observer link closed");
        self.on_disconnected(epoch);
    }

    fn on_disconnected(self: &Arc<Self>, epoch: u64) {
        let mut control = self.lock();
        if control.epoch != epoch {
            return;
        }
        control.outbound = None;
        control.in_flight = false;
        self.set_state(ConnectionState::Disconnected);

        if let Some(previous) = control.retry.take() {
            previous.abort();
        }
        let this = Arc::clone(self);
        let delay = self.delay;
        control.retry = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            debug!("retry timer fired");
            this.start(Some(epoch));
        }));
        info!(delay_ms = delay.as_millis(), "reconnect scheduled");
    }
}

/// Keeps an observer link up, retrying after a fixed delay.
///
/// Dropping the manager disconnects it.
pub struct ReconnectManager<C: Connector> {
    inner: Arc<Inner<C>>,
}

impl<C: Connector> ReconnectManager<C> {
    /// Manager that dials through `connector` and waits `delay` between
    /// attempts. Nothing happens until [`connect`](Self::connect).
    pub fn new(connector: C, delay: Duration) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            inner: Arc::new(Inner {
                connector,
                delay,
                state,
                control: Mutex::new(Control::default()),
                listeners: ListenerRegistry::new(),
            }),
        }
    }

    /// Begin connecting. A no-op while connecting or connected.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn connect(&self) {
        self.inner.start(None);
    }

    /// Drop the link and cancel any pending retry. No retry is armed.
    pub fn disconnect(&self) {
        let mut control = self.inner.lock();
        control.epoch = control.epoch.wrapping_add(1);
        control.in_flight = false;
        control.outbound = None;
        if let Some(session) = control.session.take() {
            session.abort();
        }
        if let Some(retry) = control.retry.take() {
            retry.abort();
        }
        self.inner.set_state(ConnectionState::Disconnected);
        debug!("observer link disconnected on request");
    }

    /// Current state.
    pub fn state(&self) -> ConnectionState {
        *self.inner.state.borrow()
    }

    /// Subscribe to state changes.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.subscribe()
    }

    /// Whether a retry timer is armed and has not fired yet.
    pub fn has_pending_retry(&self) -> bool {
        self.inner
            .lock()
            .retry
            .as_ref()
            .is_some_and(|retry| !retry.is_finished())
    }

    /// The configured retry delay.
    pub fn delay(&self) -> Duration {
        self.inner.delay
    }

    /// Subscribe to decoded inbound messages.
    pub fn add_listener(
        &self,
        listener: impl Fn(&Message) + Send + Sync + 'static,
    ) -> ListenerHandle {
        self.inner.listeners.add(listener)
    }

    /// Ask the server to toggle `switch_id`.
    ///
    /// # Errors
    ///
    /// [`ClientError::NotConnected`] when no link is up,
    /// [`ClientError::Transport`] if the link closed while sending.
    pub async fn send_toggle(&self, switch_id: impl Into<SwitchId>) -> Result<(), ClientError> {
        let text = switchboard_types::encode(&Message::toggle(switch_id))?;
        let outbound = self
            .inner
            .lock()
            .outbound
            .clone()
            .ok_or(ClientError::NotConnected)?;
        outbound
            .send(text)
            .await
            .map_err(|e| ClientError::Transport(format!("link closed: {e}")))
    }
}

impl<C: Connector> Drop for ReconnectManager<C> {
    fn drop(&mut self) {
        self.disconnect();
    }
}

impl<C: Connector> std::fmt::Debug for ReconnectManager<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconnectManager")
            .field("state", &self.state())
            .field("delay", &self.inner.delay)
            .finish_non_exhaustive()
    }
}
