//! Error types for the daemon binary.
//!
//! [`DaemonError`] wraps every failure mode between process start and the
//! server returning.

/// Top-level error for the daemon binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: switchboard_core::ConfigError,
    },

    /// The HTTP + observer server failed to bind or serve.
    #[error("server error: {source}")]
    Server {
        /// The underlying server error.
        #[from]
        source: switchboard_server::ServerError,
    },
}
