//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the newsletter service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Listener configuration (host and port).
    pub listener: ListenerConfig,

    /// Connection pool configuration for the subscriber database.
    pub database: DatabaseConfig,

    /// Graceful shutdown settings.
    pub shutdown: ShutdownConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Request size limits.
    pub limits: LimitsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Host name or address to bind (e.g., "localhost", "0.0.0.0").
    pub host: String,

    /// TCP port. Zero binds an ephemeral port.
    pub port: u16,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8080,
        }
    }
}

/// Connection pool configuration.
///
/// Immutable once handed to [`crate::storage::Database`].
#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,

    /// Database name.
    pub name: String,

    /// Upper bound on open connections.
    pub max_open_connections: u32,

    /// Idle connections to retain. Zero reclaims idle connections promptly.
    pub max_idle_connections: u32,

    /// Maximum lifetime of a single connection in seconds.
    pub connection_max_lifetime_secs: u64,
}

impl DatabaseConfig {
    pub fn connection_max_lifetime(&self) -> Duration {
        Duration::from_secs(self.connection_max_lifetime_secs)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            user: String::new(),
            password: String::new(),
            name: String::new(),
            max_open_connections: 10,
            max_idle_connections: 10,
            connection_max_lifetime_secs: 60 * 60,
        }
    }
}

// Hand-written so the password never ends up in logs.
impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("name", &self.name)
            .field("max_open_connections", &self.max_open_connections)
            .field("max_idle_connections", &self.max_idle_connections)
            .field("connection_max_lifetime_secs", &self.connection_max_lifetime_secs)
            .finish()
    }
}

/// Graceful shutdown configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ShutdownConfig {
    /// Time in-flight requests get to finish once shutdown starts, in seconds.
    pub grace_period_secs: u64,
}

impl ShutdownConfig {
    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(self.grace_period_secs)
    }
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            grace_period_secs: 10,
        }
    }
}

/// Timeout configuration for inbound requests.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Request size limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum body size in bytes.
    pub max_body_size: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_size: 16 * 1024,
        }
    }
}

/// Which logging setup to install at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogEnv {
    /// JSON lines at `info`.
    Production,
    /// Human-readable output at `debug`.
    #[default]
    Development,
    /// No subscriber; events are discarded.
    #[serde(other)]
    Disabled,
}

impl FromStr for LogEnv {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "production" => LogEnv::Production,
            "development" => LogEnv::Development,
            _ => LogEnv::Disabled,
        })
    }
}

impl fmt::Display for LogEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogEnv::Production => "production",
            LogEnv::Development => "development",
            LogEnv::Disabled => "disabled",
        };
        f.write_str(name)
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Logging setup to install.
    pub log_env: LogEnv,

    /// Filter directive overriding the per-environment default (e.g., "info").
    pub log_level: Option<String>,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_env: LogEnv::Development,
            log_level: None,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
