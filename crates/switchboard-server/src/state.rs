//! Shared application state for the Switchboard server.
//!
//! [`AppState`] bundles the authoritative [`Registry`] with the
//! [`ConnectionHub`] and wires the [`Broadcaster`] between them at
//! construction, so every state built here fans mutations out the same way.

use std::sync::Arc;

use switchboard_core::config::ServerSettings;
use switchboard_core::{Registry, SwitchboardConfig};
use switchboard_types::Switch;

use crate::broadcaster::Broadcaster;
use crate::hub::ConnectionHub;

/// Default outbound queue depth per observer connection.
const DEFAULT_OUTBOX_CAPACITY: usize = 64;

/// Default observer endpoint path.
const DEFAULT_WS_PATH: &str = "/ws";

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`] and injected via Axum's `State` extractor.
#[derive(Debug)]
pub struct AppState {
    /// The authoritative switch store.
    pub registry: Arc<Registry>,
    /// Live observer connections.
    pub hub: Arc<ConnectionHub>,
    /// Path the observer `WebSocket` endpoint is mounted on.
    pub ws_path: String,
    /// Outbound queue depth for each new observer connection.
    pub outbox_capacity: usize,
}

impl AppState {
    /// Create state holding `switches` with default endpoint settings.
    pub fn new(switches: impl IntoIterator<Item = Switch>) -> Self {
        Self::with_settings(switches, DEFAULT_WS_PATH, DEFAULT_OUTBOX_CAPACITY)
    }

    /// Create state from a loaded configuration.
    pub fn from_config(config: &SwitchboardConfig) -> Self {
        let ServerSettings {
            ws_path,
            outbox_capacity,
            ..
        } = &config.server;
        Self::with_settings(config.switches.iter().cloned(), ws_path, *outbox_capacity)
    }

    fn with_settings(
        switches: impl IntoIterator<Item = Switch>,
        ws_path: &str,
        outbox_capacity: usize,
    ) -> Self {
        let registry = Arc::new(Registry::new(switches));
        let hub = Arc::new(ConnectionHub::new(Arc::clone(&registry)));
        Broadcaster::attach(&registry, &hub);
        Self {
            registry,
            hub,
            ws_path: ws_path.to_owned(),
            outbox_capacity,
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::from_config(&SwitchboardConfig::default())
    }
}
