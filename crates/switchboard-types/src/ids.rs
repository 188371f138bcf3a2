//! Typed identifiers.
//!
//! [`SwitchId`] is the stable, provisioning-assigned key of a switch and is
//! carried verbatim on the wire. [`ConnectionId`] names one live observer
//! connection on the server; it is generated per connection and never
//! survives a reconnect.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Stable identifier of a switch (e.g. `SWITCH1`).
///
/// Serialized as a bare JSON string so it can key the snapshot map.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(transparent)]
#[ts(export, export_to = "bindings/")]
pub struct SwitchId(String);

impl SwitchId {
    /// Wrap a raw identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Return the inner [`String`].
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl core::fmt::Display for SwitchId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SwitchId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for SwitchId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl core::borrow::Borrow<str> for SwitchId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Identifier of one live observer connection.
///
/// UUID v7 so log lines sort by connect time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    /// Create a fresh connection identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Return the inner [`Uuid`] value.
    pub const fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn switch_id_serializes_as_plain_string() {
        let id = SwitchId::new("SWITCH1");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"SWITCH1\"");
    }

    #[test]
    fn switch_id_borrows_as_str_for_map_lookups() {
        let mut map = std::collections::BTreeMap::new();
        map.insert(SwitchId::new("SWITCH2"), 2);
        assert_eq!(map.get("SWITCH2"), Some(&2));
    }

    #[test]
    fn connection_ids_are_unique() {
        assert_ne!(ConnectionId::new(), ConnectionId::new());
    }
}
