//! OS signal handling.
//!
//! # Responsibilities
//! - Register SIGTERM and SIGINT handlers once, at process entry
//! - Turn the first signal into a cancelled token
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - Only this module touches signal machinery; everything else sees a
//!   `CancellationToken`
//! - Repeated signals are logged and otherwise ignored

use tokio_util::sync::CancellationToken;

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

/// Register termination handlers and return a token cancelled on the first
/// SIGINT or SIGTERM.
///
/// Must be called from within a Tokio runtime.
#[cfg(unix)]
pub fn shutdown_token() -> Result<CancellationToken, std::io::Error> {
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    let token = CancellationToken::new();
    let trigger = token.clone();

    tokio::spawn(async move {
        loop {
            let (name, received) = tokio::select! {
                r = sigterm.recv() => ("SIGTERM", r),
                r = sigint.recv() => ("SIGINT", r),
            };
            // The signal driver is gone; the runtime is shutting down.
            if received.is_none() {
                break;
            }
            if trigger.is_cancelled() {
                tracing::warn!(signal = name, "Shutdown already in progress");
            } else {
                tracing::info!(signal = name, "Shutdown signal received");
                trigger.cancel();
            }
        }
    });

    Ok(token)
}

/// Register the Ctrl+C handler and return a token cancelled on the first press.
#[cfg(not(unix))]
pub fn shutdown_token() -> Result<CancellationToken, std::io::Error> {
    let token = CancellationToken::new();
    let trigger = token.clone();

    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if trigger.is_cancelled() {
                tracing::warn!(signal = "ctrl-c", "Shutdown already in progress");
            } else {
                tracing::info!(signal = "ctrl-c", "Shutdown signal received");
                trigger.cancel();
            }
        }
    });

    Ok(token)
}
