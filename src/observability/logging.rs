//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the global `tracing` subscriber once at startup
//! - Pick the output format from the configured log environment
//!
//! # Design Decisions
//! - JSON format for production, human-readable format for development
//! - Any other environment installs nothing, so events are discarded
//! - `RUST_LOG` overrides the configured filter

use std::io::Write;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogEnv, ObservabilityConfig};

const PRODUCTION_FILTER: &str = "info";
const DEVELOPMENT_FILTER: &str = "newsletter=debug,tower_http=debug,info";

/// Failure to install the global subscriber.
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("invalid log filter '{directive}': {source}")]
    Filter {
        directive: String,
        #[source]
        source: tracing_subscriber::filter::ParseError,
    },

    #[error("failed to install logger: {0}")]
    Install(#[from] tracing_subscriber::util::TryInitError),
}

/// Install the global subscriber for `config.log_env`.
///
/// `release` identifies the running build and is logged once the subscriber
/// is in place.
pub fn init(config: &ObservabilityConfig, release: &str) -> Result<(), LoggingError> {
    let default_directive = match config.log_env {
        LogEnv::Production => PRODUCTION_FILTER,
        LogEnv::Development => DEVELOPMENT_FILTER,
        LogEnv::Disabled => return Ok(()),
    };
    let filter = build_filter(config.log_level.as_deref().unwrap_or(default_directive))?;

    let registry = tracing_subscriber::registry().with(filter);
    match config.log_env {
        LogEnv::Production => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false),
            )
            .try_init()?,
        _ => registry.with(tracing_subscriber::fmt::layer()).try_init()?,
    }

    tracing::info!(
        release = %release,
        log_env = %config.log_env,
        "Logger initialized"
    );
    Ok(())
}

fn build_filter(directive: &str) -> Result<EnvFilter, LoggingError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(directive).map_err(|source| LoggingError::Filter {
        directive: directive.to_string(),
        source,
    })
}

/// Flush buffered log output before exit.
pub fn flush() {
    // If stdout cannot be flushed there is nowhere left to report it.
    let _ = std::io::stdout().flush();
}
