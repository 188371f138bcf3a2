//! Mirror client entry point.
//!
//! Hydrates a local mirror of a Switchboard server, keeps it current over
//! the observer link, and logs every change until Ctrl-C.

use switchboard_client::{ClientConfig, FileCache, RestClient, SwitchClient, WsConnector};
use switchboard_types::Message;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration is invalid.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .init();

    info!("switchboard-mirror starting");

    let config = ClientConfig::from_env()?;
    info!(
        api_url = config.api_url,
        ws_url = config.ws_url,
        cache_path = %config.cache_path.display(),
        reconnect_delay_ms = config.reconnect_delay.as_millis(),
        "configuration loaded"
    );

    let rest = RestClient::new(config.api_url.as_str());
    let client = SwitchClient::new(
        WsConnector::new(config.ws_url.as_str()),
        FileCache::new(&config.cache_path),
        config.reconnect_delay,
    );

    let _log = client.add_listener(|message| match message {
        Message::Init { switches } => info!(count = switches.len(), "baseline received"),
        Message::Update { switch } => {
            info!(switch_id = %switch.id, status = %switch.status, "switch changed");
        }
        Message::ToggleRequest { .. } => {}
    });

    if let Err(e) = client.start(&rest).await {
        warn!(error = %e, "initial snapshot unavailable, waiting for INIT");
    }
    for switch in client.switches().values() {
        info!(switch_id = %switch.id, name = switch.name, status = %switch.status, "mirrored");
    }

    let mut states = client.watch_state();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("received Ctrl-C, shutting down");
                break;
            }
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = *states.borrow_and_update();
                info!(%state, "observer link");
            }
        }
    }

    client.shutdown();
    Ok(())
}
