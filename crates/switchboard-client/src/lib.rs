//! Mirror client for Switchboard.
//!
//! Keeps a local copy of the server's switches. The copy is seeded from a
//! durable cache or a one-shot REST fetch, then kept current over a
//! reconnecting observer link.
//!
//! # Architecture
//!
//! ```text
//! RestClient --(snapshot)--> Mirror <--(listener)-- ReconnectManager <-- Connector
//!                              |                          |
//!                         MirrorCache              send_toggle (TOGGLE_SWITCH)
//! ```
//!
//! # Modules
//!
//! - [`cache`] -- Durable snapshot storage
//! - [`client`] -- [`SwitchClient`] facade
//! - [`config`] -- Environment configuration
//! - [`connector`] -- Link establishment (`WebSocket` and test seams)
//! - [`error`] -- Client error types
//! - [`listeners`] -- Inbound message subscribers
//! - [`mirror`] -- Local map and hydration state machine
//! - [`reconnect`] -- Link state machine with retry timer
//! - [`rest`] -- HTTP client for the switch endpoints

pub mod cache;
pub mod client;
pub mod config;
pub mod connector;
pub mod error;
pub mod listeners;
pub mod mirror;
pub mod reconnect;
pub mod rest;

pub use cache::{FileCache, MemoryCache, MirrorCache};
pub use client::SwitchClient;
pub use config::ClientConfig;
pub use connector::{Connector, Link, WsConnector};
pub use error::{CacheError, ClientError};
pub use listeners::ListenerHandle;
pub use mirror::{Mirror, MirrorState, SnapshotSource};
pub use reconnect::{ConnectionState, ReconnectManager};
pub use rest::RestClient;
