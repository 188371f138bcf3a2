//! Enumeration types for Switchboard.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Binary state of a switch.
///
/// Serialized as `"ON"` / `"OFF"` on the wire and in REST bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "UPPERCASE")]
#[ts(export, export_to = "bindings/")]
pub enum SwitchStatus {
    /// The switch is on.
    On,
    /// The switch is off.
    Off,
}

impl SwitchStatus {
    /// The opposite state.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::On => Self::Off,
            Self::Off => Self::On,
        }
    }

    /// Wire spelling of this status.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::On => "ON",
            Self::Off => "OFF",
        }
    }
}

impl core::fmt::Display for SwitchStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A status string that is neither `ON` nor `OFF`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid status {0:?}: must be ON or OFF")]
pub struct InvalidStatus(pub String);

impl core::str::FromStr for SwitchStatus {
    type Err = InvalidStatus;

    /// Parse the exact wire spelling. Matching is case-sensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ON" => Ok(Self::On),
            "OFF" => Ok(Self::Off),
            other => Err(InvalidStatus(other.to_owned())),
        }
    }
}
