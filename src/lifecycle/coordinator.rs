//! Process-level start/stop orchestration.
//!
//! # Responsibilities
//! - Run the service's blocking `start`
//! - Concurrently wait for the shutdown token, then call `stop`
//! - Fold both outcomes into one result and one exit code
//!
//! # Design Decisions
//! - A failed `start` returns immediately; the shutdown task is aborted
//!   before it can call `stop`
//! - If `start` returns cleanly without a signal, the shutdown path is driven
//!   anyway so `stop` always finishes before the process exits
//! - The release tag is passed in, not read from a global

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::lifecycle::Service;

/// Exit code for a clean shutdown.
pub const EXIT_SUCCESS: u8 = 0;
/// Exit code for any startup, shutdown or task failure.
pub const EXIT_FAILURE: u8 = 1;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Aggregated failure of the serving loop or the shutdown routine.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("error starting server: {0}")]
    Start(#[source] BoxError),

    #[error("error stopping server: {0}")]
    Stop(#[source] BoxError),

    #[error("shutdown task did not complete: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Map a coordinator outcome to a process exit code.
pub fn exit_code(outcome: &Result<(), LifecycleError>) -> u8 {
    match outcome {
        Ok(()) => EXIT_SUCCESS,
        Err(_) => EXIT_FAILURE,
    }
}

/// Drives one service through start and signal-triggered stop.
#[derive(Debug, Clone)]
pub struct Coordinator {
    release: String,
}

impl Coordinator {
    pub fn new(release: impl Into<String>) -> Self {
        Self {
            release: release.into(),
        }
    }

    /// Run `service` until it stops.
    ///
    /// `shutdown` is the process-wide termination token. It is only observed,
    /// never cancelled, by the coordinator.
    pub async fn run<S>(&self, service: Arc<S>, shutdown: CancellationToken) -> Result<(), LifecycleError>
    where
        S: Service + ?Sized + 'static,
    {
        let span = tracing::info_span!("lifecycle", release = %self.release);
        drive(service, shutdown).instrument(span).await
    }
}

async fn drive<S>(service: Arc<S>, shutdown: CancellationToken) -> Result<(), LifecycleError>
where
    S: Service + ?Sized + 'static,
{
    let trigger = shutdown.child_token();

    let stopper = {
        let service = Arc::clone(&service);
        let trigger = trigger.clone();
        tokio::spawn(
            async move {
                trigger.cancelled().await;
                tracing::info!("Stopping server");
                service.stop().await.map_err(|err| {
                    tracing::error!(error = %err, "Error stopping server");
                    LifecycleError::Stop(Box::new(err))
                })
            }
            .in_current_span(),
        )
    };

    if let Err(err) = service.start().await {
        tracing::error!(error = %err, "Error starting server");
        stopper.abort();
        return Err(LifecycleError::Start(Box::new(err)));
    }

    trigger.cancel();
    stopper.await??;

    tracing::info!("Shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Debug, thiserror::Error)]
    #[error("{0}")]
    struct FakeError(&'static str);

    /// Blocks in `start` until `stop` is called, like the real server.
    #[derive(Default)]
    struct FakeService {
        fail_start: bool,
        fail_stop: bool,
        exit_on_its_own: bool,
        stopped: CancellationToken,
        stop_calls: AtomicUsize,
    }

    #[async_trait]
    impl Service for FakeService {
        type Error = FakeError;

        async fn start(&self) -> Result<(), FakeError> {
            if self.fail_start {
                return Err(FakeError("address in use"));
            }
            if !self.exit_on_its_own {
                self.stopped.cancelled().await;
            }
            Ok(())
        }

        async fn stop(&self) -> Result<(), FakeError> {
            self.stop_calls.fetch_add(1, Ordering::SeqCst);
            self.stopped.cancel();
            if self.fail_stop {
                Err(FakeError("grace period elapsed"))
            } else {
                Ok(())
            }
        }
    }

    async fn run_with_timeout(
        service: Arc<FakeService>,
        shutdown: CancellationToken,
    ) -> Result<(), LifecycleError> {
        tokio::time::timeout(
            Duration::from_secs(5),
            Coordinator::new("test").run(service, shutdown),
        )
        .await
        .expect("coordinator hung")
    }

    #[tokio::test]
    async fn signal_stops_cleanly() {
        let service = Arc::new(FakeService::default());
        let shutdown = CancellationToken::new();

        let signal = shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            signal.cancel();
        });

        let outcome = run_with_timeout(service.clone(), shutdown).await;
        assert!(outcome.is_ok());
        assert_eq!(exit_code(&outcome), EXIT_SUCCESS);
        assert_eq!(service.stop_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn start_failure_skips_stop() {
        let service = Arc::new(FakeService {
            fail_start: true,
            ..FakeService::default()
        });

        let outcome = run_with_timeout(service.clone(), CancellationToken::new()).await;
        assert!(matches!(outcome, Err(LifecycleError::Start(_))));
        assert_eq!(exit_code(&outcome), EXIT_FAILURE);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(service.stop_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn stop_failure_is_aggregated() {
        let service = Arc::new(FakeService {
            fail_stop: true,
            ..FakeService::default()
        });
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        let outcome = run_with_timeout(service.clone(), shutdown).await;
        assert!(matches!(outcome, Err(LifecycleError::Stop(_))));
        assert_eq!(exit_code(&outcome), EXIT_FAILURE);
    }

    #[tokio::test]
    async fn natural_exit_still_runs_stop() {
        let service = Arc::new(FakeService {
            exit_on_its_own: true,
            ..FakeService::default()
        });
        let shutdown = CancellationToken::new();

        let outcome = run_with_timeout(service.clone(), shutdown.clone()).await;
        assert!(outcome.is_ok());
        assert_eq!(service.stop_calls.load(Ordering::SeqCst), 1);
        assert!(!shutdown.is_cancelled());
    }
}
