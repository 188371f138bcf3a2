//! Entity structs for Switchboard.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::SwitchStatus;
use crate::ids::SwitchId;

/// A named, binary-state entity tracked by the server registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Switch {
    /// Stable identifier assigned at provisioning. Never changes.
    pub id: SwitchId,
    /// Display label.
    pub name: String,
    /// Current state.
    pub status: SwitchStatus,
}

impl Switch {
    /// Build a switch record.
    pub fn new(id: impl Into<SwitchId>, name: impl Into<String>, status: SwitchStatus) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            status,
        }
    }
}

/// Full id-to-switch mapping, as carried by a snapshot.
///
/// Ordered so snapshots serialize deterministically.
pub type SwitchMap = BTreeMap<SwitchId, Switch>;

/// Index a list of switches by id. Later duplicates win.
pub fn index_by_id(switches: impl IntoIterator<Item = Switch>) -> SwitchMap {
    switches
        .into_iter()
        .map(|switch| (switch.id.clone(), switch))
        .collect()
}
