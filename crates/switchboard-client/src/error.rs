//! Error types for the mirror client.
//!
//! Uses `thiserror` for typed errors that surface through the client
//! pipeline: link establishment, REST calls, outbound encoding, local cache.

use switchboard_types::SwitchId;

/// Errors that can occur during mirror client operation.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The observer link could not be established.
    #[error("connect failed: {0}")]
    ConnectFailure(String),

    /// An established link failed while sending or receiving.
    #[error("transport error: {0}")]
    Transport(String),

    /// A toggle was requested while no observer link is up.
    #[error("not connected")]
    NotConnected,

    /// The server does not know this switch.
    #[error("switch not found: {0}")]
    NotFound(SwitchId),

    /// A REST call failed or returned an unexpected status.
    #[error("HTTP error: {0}")]
    Http(String),

    /// An outbound message could not be encoded.
    #[error("encode error: {0}")]
    Encode(#[from] serde_json::Error),

    /// Configuration is invalid.
    #[error("config error: {0}")]
    Config(String),
}

/// Errors from the durable mirror cache.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Reading or writing the backing file failed.
    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The cached snapshot is not a valid switch map.
    #[error("cache contents invalid: {0}")]
    Serde(#[from] serde_json::Error),
}
