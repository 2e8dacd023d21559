//! Metrics collection and exposition.
//!
//! # Metrics
//! - `newsletter_signups_total` (counter): signups by outcome
//! - `newsletter_signup_duration_seconds` (histogram): signup latency
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder the calls are no-ops
//! - The Prometheus exporter is optional and serves its own HTTP listener

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape endpoint on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record a finished signup.
pub fn record_signup(outcome: &'static str, start: Instant) {
    ::metrics::counter!("newsletter_signups_total", "outcome" => outcome).increment(1);
    ::metrics::histogram!("newsletter_signup_duration_seconds", "outcome" => outcome)
        .record(start.elapsed().as_secs_f64());
}
