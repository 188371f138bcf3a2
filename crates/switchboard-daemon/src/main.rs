//! Switchboard server binary.
//!
//! Wires configuration, the registry, and the HTTP + observer server
//! together, then serves until Ctrl-C.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `switchboard-config.yaml` (or the path in
//!    `SWITCHBOARD_CONFIG`)
//! 2. Initialize structured logging (tracing), `RUST_LOG` overriding
//!    `logging.level`
//! 3. Provision the registry and wire the broadcaster
//! 4. Serve REST and the observer endpoint until Ctrl-C

mod error;

use std::path::PathBuf;
use std::sync::Arc;

use switchboard_core::SwitchboardConfig;
use switchboard_server::{AppState, ServerConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::DaemonError;

/// Default configuration file, relative to the working directory.
const DEFAULT_CONFIG_PATH: &str = "switchboard-config.yaml";

/// Application entry point for the daemon.
///
/// # Errors
///
/// Returns an error if configuration is invalid or the server cannot
/// bind.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration. Logging is not up yet, so remember whether
    //    defaults were used and report it afterwards.
    let config_path = std::env::var("SWITCHBOARD_CONFIG")
        .map_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    let (config, from_file) = load_config(&config_path)?;

    // 2. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_target(true)
        .init();

    info!("switchboard-daemon starting");
    if from_file {
        info!(path = %config_path.display(), "Configuration loaded");
    } else {
        warn!(path = %config_path.display(), "Config file not found, using defaults");
    }
    info!(
        host = config.server.host,
        port = config.server.port,
        ws_path = config.server.ws_path,
        outbox_capacity = config.server.outbox_capacity,
        switch_count = config.switches.len(),
        "Server settings"
    );

    // 3. Provision the registry.
    let state = Arc::new(AppState::from_config(&config));
    for switch in state.registry.list() {
        info!(switch_id = %switch.id, name = switch.name, status = %switch.status, "Switch provisioned");
    }

    // 4. Serve until Ctrl-C.
    let server_config = ServerConfig::from(&config.server);
    switchboard_server::start_server(&server_config, state, shutdown_signal())
        .await
        .map_err(DaemonError::from)?;

    info!("switchboard-daemon stopped");
    Ok(())
}

/// Load configuration from `path`, falling back to defaults when the file
/// does not exist. Returns the config and whether the file was read.
fn load_config(path: &std::path::Path) -> Result<(SwitchboardConfig, bool), DaemonError> {
    if path.exists() {
        Ok((SwitchboardConfig::from_file(path)?, true))
    } else {
        let mut config = SwitchboardConfig::default();
        config.apply_env_overrides()?;
        Ok((config, false))
    }
}

/// Resolves on Ctrl-C.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("Received Ctrl-C, shutting down");
}
