//! Shared type definitions for Switchboard.
//!
//! This crate is the single source of truth for the switch model and the
//! observer wire protocol used by both the server and the mirror client.
//! Types flow downstream to `TypeScript` via `ts-rs` for the browser front
//! end.
//!
//! # Modules
//!
//! - [`ids`] -- Typed switch and connection identifiers
//! - [`enums`] -- [`SwitchStatus`] and its parse error
//! - [`structs`] -- The [`Switch`] record and snapshot map
//! - [`message`] -- Tagged observer messages and the codec

pub mod enums;
pub mod ids;
pub mod message;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{InvalidStatus, SwitchStatus};
pub use ids::{ConnectionId, SwitchId};
pub use message::{DecodeError, Message, decode, encode};
pub use structs::{Switch, SwitchMap, index_by_id};
