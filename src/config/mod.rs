//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! .env file (optional, loaded by main)
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize, environment overrides)
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated, immutable)
//!     → plain values handed to storage, http and lifecycle
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Environment variables win over the file
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AppConfig, DatabaseConfig, LimitsConfig, ListenerConfig, LogEnv, ObservabilityConfig,
    ShutdownConfig, TimeoutConfig,
};
