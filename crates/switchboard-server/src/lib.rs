//! HTTP + `WebSocket` server for Switchboard.
//!
//! This crate provides an Axum server that exposes:
//!
//! - **REST endpoints** (`/switches`, `/switches/{id}`) to list, read, and
//!   set switches
//! - **Observer `WebSocket`** (default `/ws`) that sends an `INIT` snapshot on
//!   connect, a `SWITCH_UPDATE` after every mutation, and accepts
//!   `TOGGLE_SWITCH` requests
//!
//! # Architecture
//!
//! ```text
//! PUT /switches/{id} ----\
//!                         +--> Registry --(observer)--> Broadcaster --> ConnectionHub --> every socket
//! TOGGLE_SWITCH frame ---/
//! ```
//!
//! The [`Registry`](switchboard_core::Registry) runs its observers under its
//! write lock, so mutation and fan-out are one step and every observer sees
//! updates in registry order. Fan-out itself never waits on a socket: each
//! connection has a bounded queue drained by its own writer task, and a
//! connection that cannot take a frame is dropped.

pub mod broadcaster;
pub mod error;
pub mod handlers;
pub mod hub;
pub mod router;
pub mod server;
pub mod startup;
pub mod state;
pub mod ws;

// Re-export primary types for convenience.
pub use broadcaster::Broadcaster;
pub use hub::{Connection, ConnectionHub};
pub use router::build_router;
pub use server::{ServerConfig, ServerError, start_server};
pub use state::AppState;
