//! Configuration loading and typed config structures for Switchboard.
//!
//! The server configuration lives in `switchboard-config.yaml`. This module
//! defines strongly-typed structs that mirror the YAML structure, and
//! provides a loader that reads and validates the file. Every section has
//! defaults, so an empty document (or no file at all) yields a working
//! server with the standard three switches.

use std::collections::BTreeSet;
use std::path::Path;

use serde::Deserialize;
use switchboard_types::{Switch, SwitchStatus};

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// Two provisioned switches share an id.
    #[error("duplicate switch id in provisioning set: {0}")]
    DuplicateSwitch(String),

    /// The observer path cannot be mounted next to the REST routes.
    #[error("invalid ws_path {path:?}: {reason}")]
    InvalidWsPath {
        /// The configured path.
        path: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// An environment override could not be parsed.
    #[error("invalid value {value:?} for {name}: {reason}")]
    InvalidOverride {
        /// The environment variable name.
        name: &'static str,
        /// The raw value found.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level server configuration.
///
/// Mirrors the structure of `switchboard-config.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SwitchboardConfig {
    /// Listener settings.
    #[serde(default)]
    pub server: ServerSettings,

    /// Provisioning set loaded into the registry at startup.
    #[serde(default = "default_switches")]
    pub switches: Vec<Switch>,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for SwitchboardConfig {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            switches: default_switches(),
            logging: LoggingConfig::default(),
        }
    }
}

impl SwitchboardConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// The `PORT` environment variable overrides `server.port`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, and the
    /// validation errors described on [`parse`](Self::parse).
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML,
    /// [`ConfigError::DuplicateSwitch`] if two switches share an id,
    /// [`ConfigError::InvalidWsPath`] if the observer path is unusable, or
    /// [`ConfigError::InvalidOverride`] if `PORT` is set but not a port.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.validate()?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Reject provisioning sets with repeated ids and observer paths the
    /// router cannot mount.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidWsPath`] for a bad `server.ws_path`, or
    /// [`ConfigError::DuplicateSwitch`] naming the first repeated id.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate_ws_path()?;

        let mut seen = BTreeSet::new();
        for switch in &self.switches {
            if !seen.insert(switch.id.as_str()) {
                return Err(ConfigError::DuplicateSwitch(switch.id.to_string()));
            }
        }
        Ok(())
    }

    /// Override settings with environment variables when set.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidOverride`] if `PORT` is not a valid port.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.server
            .apply_port_override(std::env::var("PORT").ok().as_deref())
    }
}

/// Listener settings for the HTTP + observer server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerSettings {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: String,

    /// TCP port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Path of the observer WebSocket endpoint.
    #[serde(default = "default_ws_path")]
    pub ws_path: String,

    /// Outbound queue depth per observer connection. A connection whose
    /// queue is full when a broadcast arrives is dropped.
    #[serde(default = "default_outbox_capacity")]
    pub outbox_capacity: usize,
}

/// Paths already taken by the REST routes.
const RESERVED_PATHS: [&str; 3] = ["/", "/switches", "/switches/{id}"];

impl ServerSettings {
    /// Replace the port with `value` when present.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidOverride`] if `value` is not a `u16`.
    pub fn apply_port_override(&mut self, value: Option<&str>) -> Result<(), ConfigError> {
        if let Some(raw) = value {
            self.port = raw
                .trim()
                .parse()
                .map_err(|e: std::num::ParseIntError| ConfigError::InvalidOverride {
                    name: "PORT",
                    value: raw.to_owned(),
                    reason: e.to_string(),
                })?;
        }
        Ok(())
    }

    /// Check that `ws_path` is a plain absolute path that does not collide
    /// with a REST route.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidWsPath`] describing the problem.
    pub fn validate_ws_path(&self) -> Result<(), ConfigError> {
        let path = self.ws_path.as_str();
        let reason = if !path.starts_with('/') {
            Some("must start with '/'")
        } else if RESERVED_PATHS.contains(&path) {
            Some("collides with a REST route")
        } else if path.contains(['{', '}', '*']) {
            Some("must not contain route parameters")
        } else {
            None
        };

        reason.map_or(Ok(()), |reason| {
            Err(ConfigError::InvalidWsPath {
                path: path.to_owned(),
                reason,
            })
        })
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            ws_path: default_ws_path(),
            outbox_capacity: default_outbox_capacity(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default `tracing` filter directive (overridden by `RUST_LOG`).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// The standard provisioning set: three switches, all off.
pub fn default_switches() -> Vec<Switch> {
    vec![
        Switch::new("SWITCH1", "Switch 1", SwitchStatus::Off),
        Switch::new("SWITCH2", "Switch 2", SwitchStatus::Off),
        Switch::new("SWITCH3", "Switch 3", SwitchStatus::Off),
    ]
}

fn default_host() -> String {
    String::from("0.0.0.0")
}

const fn default_port() -> u16 {
    3000
}

fn default_ws_path() -> String {
    String::from("/ws")
}

const fn default_outbox_capacity() -> usize {
    64
}

fn default_log_level() -> String {
    String::from("info")
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = SwitchboardConfig::default();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.ws_path, "/ws");
        assert_eq!(config.switches.len(), 3);
        assert!(config.switches.iter().all(|s| s.status == SwitchStatus::Off));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r#"
server:
  host: "127.0.0.1"
  port: 4010
  ws_path: "/observe"
  outbox_capacity: 8

switches:
  - id: PUMP
    name: "Pump"
    status: "ON"
  - id: FAN
    name: "Fan"
    status: "OFF"

logging:
  level: "debug"
"#;
        let mut config: SwitchboardConfig = serde_yml::from_str(yaml).unwrap();
        config.validate().unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 4010);
        assert_eq!(config.server.ws_path, "/observe");
        assert_eq!(config.server.outbox_capacity, 8);
        assert_eq!(config.switches.len(), 2);
        assert_eq!(config.switches[0].status, SwitchStatus::On);
        assert_eq!(config.logging.level, "debug");

        config.server.apply_port_override(None).unwrap();
        assert_eq!(config.server.port, 4010);
    }

    #[test]
    fn empty_sections_fall_back_to_defaults() {
        let config: SwitchboardConfig = serde_yml::from_str("server: {}\n").unwrap();
        assert_eq!(config.server, ServerSettings::default());
        assert_eq!(config.switches, default_switches());
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let yaml = r#"
switches:
  - { id: A, name: "a", status: "OFF" }
  - { id: A, name: "again", status: "ON" }
"#;
        let config: SwitchboardConfig = serde_yml::from_str(yaml).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DuplicateSwitch(ref id)) if id == "A"
        ));
    }

    #[test]
    fn unknown_status_is_a_yaml_error() {
        let yaml = "switches:\n  - { id: A, name: a, status: MAYBE }\n";
        assert!(serde_yml::from_str::<SwitchboardConfig>(yaml).is_err());
    }

    #[test]
    fn port_override() {
        let mut settings = ServerSettings::default();
        settings.apply_port_override(Some("3035")).unwrap();
        assert_eq!(settings.port, 3035);

        let err = settings.apply_port_override(Some("not-a-port")).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidOverride { name: "PORT", .. }));
        assert_eq!(settings.port, 3035);
    }

    fn with_ws_path(path: &str) -> SwitchboardConfig {
        let mut config = SwitchboardConfig::default();
        config.server.ws_path = path.to_owned();
        config
    }

    fn ws_path_rejection(path: &str) -> &'static str {
        match with_ws_path(path).validate() {
            Err(ConfigError::InvalidWsPath { path: p, reason }) if p == path => reason,
            other => panic!("expected InvalidWsPath for {path:?}, got {other:?}"),
        }
    }

    #[test]
    fn relative_ws_path_is_rejected() {
        assert_eq!(ws_path_rejection("ws"), "must start with '/'");
        assert_eq!(ws_path_rejection(""), "must start with '/'");
    }

    #[test]
    fn ws_path_on_root_is_rejected() {
        assert_eq!(ws_path_rejection("/"), "collides with a REST route");
    }

    #[test]
    fn ws_path_on_switch_routes_is_rejected() {
        assert_eq!(ws_path_rejection("/switches"), "collides with a REST route");
        assert_eq!(
            ws_path_rejection("/switches/{id}"),
            "collides with a REST route"
        );
    }

    #[test]
    fn ws_path_with_parameters_is_rejected() {
        assert_eq!(
            ws_path_rejection("/observe/{name}"),
            "must not contain route parameters"
        );
        assert_eq!(
            ws_path_rejection("/observe/{*rest}"),
            "must not contain route parameters"
        );
    }

    #[test]
    fn bad_ws_path_fails_parse() {
        let err = SwitchboardConfig::parse("server:\n  ws_path: \"/switches\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidWsPath { .. }));
    }

    #[test]
    fn custom_ws_path_is_accepted() {
        assert!(with_ws_path("/observe").validate().is_ok());
        assert!(with_ws_path("/switches/live").validate().is_ok());
    }
}
