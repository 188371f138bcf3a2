//! Authoritative switch state for Switchboard.
//!
//! This crate owns the server-side source of truth: the [`Registry`] of
//! switches and the configuration that provisions it.
//!
//! # Modules
//!
//! - [`registry`] -- The [`Registry`] store with `list` / `get` / `toggle` /
//!   `set_status` and an injectable mutation-observer hook.
//! - [`config`] -- Configuration loading from `switchboard-config.yaml` into
//!   strongly-typed structs.
//!
//! [`Registry`]: registry::Registry

pub mod config;
pub mod registry;

pub use config::{ConfigError, SwitchboardConfig};
pub use registry::{MutationObserver, Registry, RegistryError};
