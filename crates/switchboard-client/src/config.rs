//! Configuration for the mirror client.
//!
//! All configuration is loaded from environment variables. Every variable is
//! optional; the defaults point at a server on `localhost:3000`.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::ClientError;

/// Default REST base URL.
pub const DEFAULT_API_URL: &str = "http://localhost:3000";

/// Default observer endpoint.
pub const DEFAULT_WS_URL: &str = "ws://localhost:3000/ws";

/// Default location of the mirror cache file.
pub const DEFAULT_CACHE_PATH: &str = "switchboard-cache.json";

/// Default wait before reconnecting after the link drops.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(3000);

/// Complete client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// REST base URL (e.g. `http://localhost:3000`).
    pub api_url: String,
    /// Observer `WebSocket` URL (e.g. `ws://localhost:3000/ws`).
    pub ws_url: String,
    /// Where the mirror persists its snapshot.
    pub cache_path: PathBuf,
    /// Fixed delay before a reconnect attempt.
    pub reconnect_delay: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_owned(),
            ws_url: DEFAULT_WS_URL.to_owned(),
            cache_path: PathBuf::from(DEFAULT_CACHE_PATH),
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Optional variables:
    /// - `SWITCHBOARD_API_URL` -- REST base URL
    /// - `SWITCHBOARD_WS_URL` -- observer endpoint
    /// - `SWITCHBOARD_CACHE_PATH` -- mirror cache file
    /// - `SWITCHBOARD_RECONNECT_DELAY_MS` -- reconnect delay in milliseconds (default 3000)
    pub fn from_env() -> Result<Self, ClientError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ClientError> {
        let defaults = Self::default();

        let reconnect_delay = match lookup("SWITCHBOARD_RECONNECT_DELAY_MS") {
            Some(raw) => Duration::from_millis(raw.trim().parse().map_err(|e| {
                ClientError::Config(format!("invalid SWITCHBOARD_RECONNECT_DELAY_MS {raw:?}: {e}"))
            })?),
            None => defaults.reconnect_delay,
        };

        Ok(Self {
            api_url: lookup("SWITCHBOARD_API_URL").unwrap_or(defaults.api_url),
            ws_url: lookup("SWITCHBOARD_WS_URL").unwrap_or(defaults.ws_url),
            cache_path: lookup("SWITCHBOARD_CACHE_PATH").map_or(defaults.cache_path, PathBuf::from),
            reconnect_delay,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_in(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let config = ClientConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.reconnect_delay, Duration::from_secs(3));
    }

    #[test]
    fn variables_override_defaults() {
        let config = ClientConfig::from_lookup(lookup_in(&[
            ("SWITCHBOARD_API_URL", "http://panel:8080"),
            ("SWITCHBOARD_WS_URL", "ws://panel:8080/ws"),
            ("SWITCHBOARD_CACHE_PATH", "/tmp/mirror.json"),
            ("SWITCHBOARD_RECONNECT_DELAY_MS", "250"),
        ]))
        .unwrap();

        assert_eq!(config.api_url, "http://panel:8080");
        assert_eq!(config.ws_url, "ws://panel:8080/ws");
        assert_eq!(config.cache_path, PathBuf::from("/tmp/mirror.json"));
        assert_eq!(config.reconnect_delay, Duration::from_millis(250));
    }

    #[test]
    fn bad_delay_is_a_config_error() {
        let err = ClientConfig::from_lookup(lookup_in(&[(
            "SWITCHBOARD_RECONNECT_DELAY_MS",
            "soon",
        )]))
        .unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));
    }
}
