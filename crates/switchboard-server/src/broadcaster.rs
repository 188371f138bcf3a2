//! Registry-to-hub glue.
//!
//! The broadcaster is the only path by which a mutation reaches observers.
//! Whether the change came from `PUT /switches/{id}` or from a
//! `TOGGLE_SWITCH` frame, the registry notifies its observers and the
//! broadcaster turns that into one `SWITCH_UPDATE` fan-out.

use std::sync::{Arc, Weak};

use switchboard_core::Registry;
use switchboard_types::Message;
use tracing::debug;

use crate::hub::ConnectionHub;

/// Subscribes a [`ConnectionHub`] to a [`Registry`].
pub struct Broadcaster;

impl Broadcaster {
    /// Forward every mutation of `registry` to `hub` as a `SWITCH_UPDATE`.
    ///
    /// The subscription holds the hub weakly; the hub itself holds the
    /// registry, so a strong reference here would form a cycle.
    pub fn attach(registry: &Registry, hub: &Arc<ConnectionHub>) {
        let hub: Weak<ConnectionHub> = Arc::downgrade(hub);
        registry.subscribe(move |switch| {
            let Some(hub) = hub.upgrade() else {
                debug!(switch_id = %switch.id, "hub dropped, update not broadcast");
                return;
            };
            hub.broadcast(&Message::Update {
                switch: switch.clone(),
            });
        });
    }
}
