//! Server configuration.
//!
//! [`ServerConfig`] is the single source of truth for all runtime settings.
//! It is read from an optional TOML file and then overridden by CLI flags in
//! `main.rs`.
//!
//! # Example file
//!
//! ```toml
//! bind_address = "0.0.0.0"
//! ws_port = 9001
//! udp_port = 9002
//! auto_approve = false
//! session_timeout_ms = 5000
//! host_width = 2560
//! host_height = 1440
//! log_level = "debug"
//! ```
//!
//! Every field is optional: fields annotated with `#[serde(default = ...)]`
//! fall back to the listed default when absent, so an empty file (or no file
//! at all) yields a working configuration.

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use touchlink_core::ScreenSize;

/// Error type for configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// `bind_address` is not an IP address.
    #[error("invalid bind address '{0}'")]
    InvalidBindAddress(String),

    /// A value is out of its allowed range.
    #[error("invalid config value: {0}")]
    Invalid(String),
}

/// All runtime configuration for the host service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    /// IP address both listeners bind to.  `"0.0.0.0"` binds all interfaces.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// TCP port of the WebSocket listener.
    #[serde(default = "default_ws_port")]
    pub ws_port: u16,

    /// UDP port of the datagram listener.
    #[serde(default = "default_udp_port")]
    pub udp_port: u16,

    /// Approve every device without asking the operator.
    #[serde(default)]
    pub auto_approve: bool,

    /// A connected device silent for longer than this loses the slot.
    #[serde(default = "default_session_timeout_ms")]
    pub session_timeout_ms: u64,

    /// How often the eviction sweeper runs.
    #[serde(default = "default_sweep_interval_ms")]
    pub sweep_interval_ms: u64,

    /// Screen width reported by the headless pointer backend.
    #[serde(default = "default_host_width")]
    pub host_width: u16,

    /// Screen height reported by the headless pointer backend.
    #[serde(default = "default_host_height")]
    pub host_height: u16,

    /// `tracing` log level: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}
fn default_ws_port() -> u16 {
    9001
}
fn default_udp_port() -> u16 {
    9002
}
fn default_session_timeout_ms() -> u64 {
    5000
}
fn default_sweep_interval_ms() -> u64 {
    1000
}
fn default_host_width() -> u16 {
    1920
}
fn default_host_height() -> u16 {
    1080
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            ws_port: default_ws_port(),
            udp_port: default_udp_port(),
            auto_approve: false,
            session_timeout_ms: default_session_timeout_ms(),
            sweep_interval_ms: default_sweep_interval_ms(),
            host_width: default_host_width(),
            host_height: default_host_height(),
            log_level: default_log_level(),
        }
    }
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl ServerConfig {
    /// Parses a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if the TOML is malformed.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Loads the config at `path`, returning `ServerConfig::default()` if the
    /// file does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] for file-system errors other than "not
    /// found", and [`ConfigError::Parse`] if the TOML is malformed.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_toml_str(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Checks value ranges that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] or [`ConfigError::InvalidBindAddress`]
    /// naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bind_ip()?;
        if self.session_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "session_timeout_ms must be greater than zero".into(),
            ));
        }
        if self.sweep_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "sweep_interval_ms must be greater than zero".into(),
            ));
        }
        if self.host_width == 0 || self.host_height == 0 {
            return Err(ConfigError::Invalid(format!(
                "host screen {}x{} has a zero dimension",
                self.host_width, self.host_height
            )));
        }
        Ok(())
    }

    // ── Derived values ────────────────────────────────────────────────────────

    /// WebSocket listen address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBindAddress`] if `bind_address` is not
    /// an IP address.
    pub fn ws_addr(&self) -> Result<SocketAddr, ConfigError> {
        Ok(SocketAddr::new(self.bind_ip()?, self.ws_port))
    }

    /// UDP listen address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBindAddress`] if `bind_address` is not
    /// an IP address.
    pub fn udp_addr(&self) -> Result<SocketAddr, ConfigError> {
        Ok(SocketAddr::new(self.bind_ip()?, self.udp_port))
    }

    pub fn session_timeout(&self) -> Duration {
        Duration::from_millis(self.session_timeout_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }

    pub fn host_screen(&self) -> ScreenSize {
        ScreenSize::new(self.host_width, self.host_height)
    }

    fn bind_ip(&self) -> Result<IpAddr, ConfigError> {
        self.bind_address
            .parse()
            .map_err(|_| ConfigError::InvalidBindAddress(self.bind_address.clone()))
    }
}
