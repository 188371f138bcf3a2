//! Observer wire protocol.
//!
//! Three message shapes travel over an observer connection, discriminated
//! by a `type` field:
//!
//! | `type` | Direction | Payload |
//! |--------|-----------|---------|
//! | `INIT` | server -> client | `switches`: full id-to-switch map |
//! | `SWITCH_UPDATE` | server -> client | `switch`: one switch |
//! | `TOGGLE_SWITCH` | client -> server | `switchId` |
//!
//! [`decode`] never panics. An unknown discriminator, a missing one, or a
//! payload that does not fit the named shape all come back as a
//! [`DecodeError`], which receivers log and skip.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;

use crate::ids::SwitchId;
use crate::structs::{Switch, SwitchMap};

/// A message on the observer connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "type")]
#[ts(export, export_to = "bindings/")]
pub enum Message {
    /// Full snapshot, sent once right after a connection is registered.
    #[serde(rename = "INIT")]
    Init {
        /// Every switch in the registry at registration time.
        switches: SwitchMap,
    },
    /// Single-entry delta, broadcast after every mutation.
    #[serde(rename = "SWITCH_UPDATE")]
    Update {
        /// The switch after the mutation.
        switch: Switch,
    },
    /// Ask the server to flip a switch.
    #[serde(rename = "TOGGLE_SWITCH")]
    ToggleRequest {
        /// Switch to flip.
        #[serde(rename = "switchId")]
        switch_id: SwitchId,
    },
}

impl Message {
    /// Discriminator of [`Message::Init`].
    pub const INIT: &'static str = "INIT";
    /// Discriminator of [`Message::Update`].
    pub const UPDATE: &'static str = "SWITCH_UPDATE";
    /// Discriminator of [`Message::ToggleRequest`].
    pub const TOGGLE: &'static str = "TOGGLE_SWITCH";

    /// The `type` value this message is tagged with.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Init { .. } => Self::INIT,
            Self::Update { .. } => Self::UPDATE,
            Self::ToggleRequest { .. } => Self::TOGGLE,
        }
    }

    /// Build a toggle request.
    pub fn toggle(switch_id: impl Into<SwitchId>) -> Self {
        Self::ToggleRequest {
            switch_id: switch_id.into(),
        }
    }
}

/// Why an inbound frame could not be turned into a [`Message`].
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The bytes are not a JSON object.
    #[error("malformed frame: {0}")]
    Malformed(serde_json::Error),

    /// The object has no string `type` field.
    #[error("frame has no type discriminator")]
    MissingType,

    /// The `type` field names no known message.
    #[error("unknown message type {0:?}")]
    UnknownType(String),

    /// The `type` is known but the payload does not match its shape.
    #[error("invalid {kind} payload: {source}")]
    InvalidPayload {
        /// The discriminator that was matched.
        kind: &'static str,
        /// The underlying shape error.
        source: serde_json::Error,
    },
}

/// Encode a message as a JSON text frame.
///
/// # Errors
///
/// Returns the serializer error; none of the message shapes can produce
/// one in practice.
pub fn encode(message: &Message) -> Result<String, serde_json::Error> {
    serde_json::to_string(message)
}

/// Decode one inbound frame.
///
/// # Errors
///
/// See [`DecodeError`]. The caller treats every variant as "ignore this
/// frame and keep the connection".
pub fn decode(bytes: &[u8]) -> Result<Message, DecodeError> {
    let value: Value = serde_json::from_slice(bytes).map_err(DecodeError::Malformed)?;

    let kind = match value.get("type").and_then(Value::as_str) {
        Some(Message::INIT) => Message::INIT,
        Some(Message::UPDATE) => Message::UPDATE,
        Some(Message::TOGGLE) => Message::TOGGLE,
        Some(other) => return Err(DecodeError::UnknownType(other.to_owned())),
        None => return Err(DecodeError::MissingType),
    };

    serde_json::from_value(value).map_err(|source| DecodeError::InvalidPayload { kind, source })
}
