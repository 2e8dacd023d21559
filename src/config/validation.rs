//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, pool bounds consistent)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use crate::config::schema::AppConfig;

/// A single semantic problem with a loaded configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("listener.host must not be empty")]
    EmptyHost,

    #[error("database.max_open_connections must be at least 1")]
    NoOpenConnections,

    #[error("database.max_idle_connections ({idle}) exceeds max_open_connections ({open})")]
    IdleExceedsOpen { idle: u32, open: u32 },

    #[error("{field} must be greater than zero")]
    ZeroDuration { field: &'static str },

    #[error("limits.max_body_size must be greater than zero")]
    ZeroBodyLimit,

    #[error("observability.metrics_address '{0}' is not a socket address")]
    MetricsAddress(String),
}

/// Check a configuration for semantic errors.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.host.trim().is_empty() {
        errors.push(ValidationError::EmptyHost);
    }

    let db = &config.database;
    if db.max_open_connections == 0 {
        errors.push(ValidationError::NoOpenConnections);
    } else if db.max_idle_connections > db.max_open_connections {
        errors.push(ValidationError::IdleExceedsOpen {
            idle: db.max_idle_connections,
            open: db.max_open_connections,
        });
    }
    if db.connection_max_lifetime_secs == 0 {
        errors.push(ValidationError::ZeroDuration {
            field: "database.connection_max_lifetime_secs",
        });
    }

    if config.shutdown.grace_period_secs == 0 {
        errors.push(ValidationError::ZeroDuration {
            field: "shutdown.grace_period_secs",
        });
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroDuration {
            field: "timeouts.request_secs",
        });
    }
    if config.limits.max_body_size == 0 {
        errors.push(ValidationError::ZeroBodyLimit);
    }

    let observability = &config.observability;
    if observability.metrics_enabled
        && observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(validate_config(&AppConfig::default()), Ok(()));
    }

    #[test]
    fn reports_every_problem() {
        let mut config = AppConfig::default();
        config.listener.host = " ".to_string();
        config.database.max_open_connections = 2;
        config.database.max_idle_connections = 5;
        config.shutdown.grace_period_secs = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::EmptyHost,
                ValidationError::IdleExceedsOpen { idle: 5, open: 2 },
                ValidationError::ZeroDuration {
                    field: "shutdown.grace_period_secs"
                },
            ]
        );
    }

    #[test]
    fn metrics_address_checked_only_when_enabled() {
        let mut config = AppConfig::default();
        config.observability.metrics_address = "not-an-address".to_string();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        assert_eq!(
            validate_config(&config).unwrap_err(),
            vec![ValidationError::MetricsAddress("not-an-address".to_string())]
        );
    }
}
