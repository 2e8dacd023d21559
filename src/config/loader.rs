//! Configuration loading from disk and the process environment.

use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::config::schema::AppConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value '{value}' for {var}: {reason}")]
    Env {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration: optional TOML file, then environment overrides, then validation.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    load_config_with(path, |var| std::env::var(var).ok())
}

/// Same as [`load_config`] with an explicit environment lookup.
pub fn load_config_with<F>(path: Option<&Path>, lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => AppConfig::default(),
    };

    apply_env(&mut config, lookup)?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Overlay environment variables on top of `config`.
pub fn apply_env<F>(config: &mut AppConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let env = Env(lookup);

    env.string("HOST", &mut config.listener.host);
    env.parsed("PORT", &mut config.listener.port)?;

    if let Some(value) = env.get("LOG_ENV") {
        config.observability.log_env = value.parse().unwrap_or_default();
    }
    if let Some(value) = env.get("LOG_LEVEL") {
        config.observability.log_level = Some(value);
    }
    env.parsed("METRICS_ENABLED", &mut config.observability.metrics_enabled)?;
    env.string("METRICS_ADDRESS", &mut config.observability.metrics_address);

    let db = &mut config.database;
    env.string("DB_HOST", &mut db.host);
    env.parsed("DB_PORT", &mut db.port)?;
    env.string("DB_USER", &mut db.user);
    env.string("DB_PASSWORD", &mut db.password);
    env.string("DB_NAME", &mut db.name);
    env.parsed("DB_MAX_OPEN_CONNECTIONS", &mut db.max_open_connections)?;
    env.parsed("DB_MAX_IDLE_CONNECTIONS", &mut db.max_idle_connections)?;
    env.seconds("DB_CONNECTION_MAX_LIFETIME", &mut db.connection_max_lifetime_secs)?;

    env.seconds("SHUTDOWN_GRACE_PERIOD", &mut config.shutdown.grace_period_secs)?;

    Ok(())
}

struct Env<F>(F);

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, var: &str) -> Option<String> {
        (self.0)(var).filter(|value| !value.is_empty())
    }

    fn string(&self, var: &str, target: &mut String) {
        if let Some(value) = self.get(var) {
            *target = value;
        }
    }

    fn parsed<T>(&self, var: &'static str, target: &mut T) -> Result<(), ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        if let Some(value) = self.get(var) {
            *target = value.trim().parse().map_err(|e: T::Err| ConfigError::Env {
                var,
                reason: e.to_string(),
                value,
            })?;
        }
        Ok(())
    }

    fn seconds(&self, var: &'static str, target: &mut u64) -> Result<(), ConfigError> {
        if let Some(value) = self.get(var) {
            let secs = parse_duration(&value)
                .and_then(|duration| match duration.subsec_nanos() {
                    0 => Ok(duration.as_secs()),
                    _ => Err("must be a whole number of seconds".to_string()),
                })
                .map_err(|reason| ConfigError::Env {
                    var,
                    reason,
                    value: value.clone(),
                })?;
            *target = secs;
        }
        Ok(())
    }
}

/// Parse a duration such as `90`, `90s`, `1h30m` or `500ms`.
///
/// A bare number is read as seconds.
pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let input = input.trim();
    if input.is_empty() {
        return Err("empty duration".to_string());
    }
    if let Ok(secs) = input.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }

    let mut total = Duration::ZERO;
    let mut rest = input;
    while !rest.is_empty() {
        let digits = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        if digits == 0 {
            return Err(format!("expected a number at '{}'", rest));
        }
        let amount: u64 = rest[..digits].parse().map_err(|e| format!("{}", e))?;
        rest = &rest[digits..];

        let unit_len = rest.find(|c: char| c.is_ascii_digit()).unwrap_or(rest.len());
        let unit = &rest[..unit_len];
        rest = &rest[unit_len..];

        let segment = match unit {
            "ms" => Some(Duration::from_millis(amount)),
            "s" => Some(Duration::from_secs(amount)),
            "m" => amount.checked_mul(60).map(Duration::from_secs),
            "h" => amount.checked_mul(60 * 60).map(Duration::from_secs),
            "" => return Err("missing unit".to_string()),
            other => return Err(format!("unknown unit '{}'", other)),
        };
        total = segment
            .and_then(|segment| total.checked_add(segment))
            .ok_or_else(|| "duration too large".to_string())?;
    }
    Ok(total)
}
