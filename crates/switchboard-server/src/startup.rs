//! Background server startup helper.
//!
//! Provides [`spawn_server`], which binds eagerly and then launches the
//! HTTP + `WebSocket` server on a background Tokio task. Binding before the
//! spawn means address errors surface to the caller instead of inside the
//! task, and the returned address carries the real port when `0` was asked
//! for.
//!
//! # Usage
//!
//! ```rust,ignore
//! use switchboard_server::startup::spawn_server;
//! use switchboard_server::{AppState, ServerConfig};
//! use std::sync::Arc;
//!
//! let state = Arc::new(AppState::default());
//! let running = spawn_server(&ServerConfig::default(), state).await?;
//! println!("listening on {}", running.addr);
//! running.shutdown().await;
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::server::{ServerConfig, ServerError, bind, serve};
use crate::state::AppState;

/// Errors that can occur when spawning the server.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// The server failed to bind or start.
    #[error("server start error: {0}")]
    Server(#[from] ServerError),
}

/// A server running on a background task.
#[derive(Debug)]
pub struct RunningServer {
    /// The address actually bound.
    pub addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl RunningServer {
    /// Ask the server to stop and wait for it to drain.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(());
        if let Err(e) = self.handle.await {
            tracing::error!(error = %e, "server task ended abnormally");
        }
    }
}

/// Bind `config` and serve on a background task.
///
/// # Errors
///
/// Returns [`StartupError::Server`] if the address cannot be bound.
pub async fn spawn_server(
    config: &ServerConfig,
    state: Arc<AppState>,
) -> Result<RunningServer, StartupError> {
    let listener = bind(config).await?;
    let addr = listener
        .local_addr()
        .map_err(|e| ServerError::Bind(format!("no local address: {e}")))?;

    let (shutdown, signal) = oneshot::channel::<()>();
    let handle = tokio::spawn(async move {
        let stop = async move {
            let _ = signal.await;
        };
        if let Err(e) = serve(listener, state, stop).await {
            tracing::error!(error = %e, "Switchboard server exited with error");
        }
    });

    tracing::info!(%addr, "Switchboard server spawned on background task");

    Ok(RunningServer {
        addr,
        shutdown,
        handle,
    })
}
