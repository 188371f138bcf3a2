//! Live observer connections and fan-out.
//!
//! Each [`Connection`] is the sending half of a bounded per-connection
//! queue. The socket task owns the receiving half and writes frames to the
//! wire, so a slow or dead socket never blocks [`ConnectionHub::broadcast`]:
//! delivery is a non-blocking enqueue, and a connection whose queue is
//! closed or full is reaped on the spot while the remaining connections
//! still get the frame.
//!
//! A reaped client misses every update until it reconnects; the `INIT`
//! snapshot it receives on reconnect is the recovery path.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockWriteGuard};

use switchboard_core::Registry;
use switchboard_types::{ConnectionId, Message};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info, warn};

/// Why a frame could not be handed to a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The socket task is gone.
    #[error("connection closed")]
    Closed,
    /// The connection's queue is full; the peer is not keeping up.
    #[error("connection outbox full")]
    Full,
}

/// Errors from [`ConnectionHub::register`].
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    /// The snapshot could not be serialized.
    #[error("failed to encode snapshot: {0}")]
    Encode(#[from] serde_json::Error),
    /// The snapshot could not be queued on the new connection.
    #[error("failed to deliver snapshot: {0}")]
    Transport(#[from] TransportError),
}

/// Handle to one live observer connection.
#[derive(Debug)]
pub struct Connection {
    /// Identifier used for unregistering and in logs.
    pub id: ConnectionId,
    outbox: mpsc::Sender<Arc<str>>,
}

impl Connection {
    /// Wrap an existing outbox sender.
    pub fn new(outbox: mpsc::Sender<Arc<str>>) -> Self {
        Self {
            id: ConnectionId::new(),
            outbox,
        }
    }

    /// Create a connection together with the receiver the socket task
    /// drains.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Arc<str>>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(tx), rx)
    }

    fn try_deliver(&self, frame: Arc<str>) -> Result<(), TransportError> {
        self.outbox.try_send(frame).map_err(|e| match e {
            TrySendError::Full(_) => TransportError::Full,
            TrySendError::Closed(_) => TransportError::Closed,
        })
    }
}

/// The set of live observer connections.
pub struct ConnectionHub {
    registry: Arc<Registry>,
    connections: RwLock<HashMap<ConnectionId, Connection>>,
}

impl ConnectionHub {
    /// Create an empty hub that snapshots `registry` for new connections.
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Add a connection and queue an `INIT` snapshot on it.
    ///
    /// The snapshot is taken and the connection inserted while the registry
    /// read lock is held, so no mutation can slip between the two: the new
    /// connection sees exactly the registry state at registration, followed
    /// by every later `SWITCH_UPDATE`.
    ///
    /// # Errors
    ///
    /// Returns [`HubError`] if the snapshot cannot be encoded or queued; the
    /// connection is not added in that case.
    pub fn register(&self, connection: Connection) -> Result<(), HubError> {
        self.registry.with_snapshot(|switches| {
            let init = Message::Init {
                switches: switches.clone(),
            };
            let frame: Arc<str> = switchboard_types::encode(&init)?.into();
            connection.try_deliver(frame)?;

            let mut conns = self.write();
            let conn_id = connection.id;
            conns.insert(conn_id, connection);
            info!(%conn_id, live = conns.len(), "observer connection registered");
            Ok(())
        })
    }

    /// Remove a connection. Removing an absent connection is a no-op.
    ///
    /// Returns whether the connection was present.
    pub fn unregister(&self, conn_id: ConnectionId) -> bool {
        let mut conns = self.write();
        let removed = conns.remove(&conn_id).is_some();
        if removed {
            info!(%conn_id, live = conns.len(), "observer connection unregistered");
        }
        removed
    }

    /// Send `message` to every live connection.
    ///
    /// The message is encoded once. Connections that cannot take the frame
    /// are removed; the rest still receive it. Returns the number of
    /// connections the frame was queued on.
    pub fn broadcast(&self, message: &Message) -> usize {
        let frame: Arc<str> = match switchboard_types::encode(message) {
            Ok(json) => json.into(),
            Err(e) => {
                warn!(kind = message.kind(), error = %e, "failed to encode broadcast");
                return 0;
            }
        };

        let mut conns = self.write();
        let mut delivered = 0_usize;
        conns.retain(|conn_id, conn| match conn.try_deliver(Arc::clone(&frame)) {
            Ok(()) => {
                delivered = delivered.saturating_add(1);
                true
            }
            Err(e) => {
                warn!(%conn_id, error = %e, "dropping dead observer connection");
                false
            }
        });
        debug!(kind = message.kind(), delivered, live = conns.len(), "broadcast sent");
        delivered
    }

    /// Number of live connections.
    pub fn len(&self) -> usize {
        self.connections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no connection is live.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `conn_id` is currently live.
    pub fn contains(&self, conn_id: ConnectionId) -> bool {
        self.connections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&conn_id)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<ConnectionId, Connection>> {
        self.connections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl core::fmt::Debug for ConnectionHub {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ConnectionHub")
            .field("live", &self.len())
            .finish_non_exhaustive()
    }
}
