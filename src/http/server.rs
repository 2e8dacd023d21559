//! HTTP server setup and lifecycle.
//!
//! # Responsibilities
//! - Create the Axum Router with all handlers and middleware
//!   (tracing, request ID, timeout, body limit)
//! - Bind the listening socket on `start` and serve until stopped
//! - Drive the lifecycle state machine through start and stop
//! - Give in-flight requests a bounded grace period on `stop`
//!
//! # Design Decisions
//! - `start` blocks for the lifetime of the serving loop; its result only
//!   reflects the serving loop itself
//! - `stop` is memoised: the first call shuts down, later or concurrent
//!   calls get the same outcome
//! - Stop before start moves straight to `Stopped`; `start` then returns `Ok`
//!   without binding

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use axum::{body::Body, extract::DefaultBodyLimit, http::Request, Router};
use tokio::net::TcpListener;
use tokio::sync::{watch, OnceCell};
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::http::handlers::{self, AppState};
use crate::http::request::{MakeRequestUuid, X_REQUEST_ID};
use crate::lifecycle::{Lifecycle, LifecycleState, Service};
use crate::storage::Newsletter;

/// Server failures. Cloneable so every `stop` caller gets the same outcome.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: Arc<std::io::Error>,
    },

    #[error("serving loop failed: {0}")]
    Serve(#[source] Arc<std::io::Error>),

    #[error("requests still in flight after {0:?} grace period")]
    GracePeriodElapsed(Duration),

    #[error("cannot start server while {0}")]
    InvalidState(LifecycleState),
}

/// Everything the server needs, already resolved.
#[derive(Clone)]
pub struct ServerOptions {
    pub host: String,
    pub port: u16,
    pub grace_period: Duration,
    pub request_timeout: Duration,
    pub max_body_size: usize,
    pub newsletter: Newsletter,
}

impl ServerOptions {
    pub fn from_config(config: &AppConfig, newsletter: Newsletter) -> Self {
        Self {
            host: config.listener.host.clone(),
            port: config.listener.port,
            grace_period: config.shutdown.grace_period(),
            request_timeout: Duration::from_secs(config.timeouts.request_secs),
            max_body_size: config.limits.max_body_size,
            newsletter,
        }
    }
}

/// HTTP server for the newsletter service.
pub struct Server {
    host: String,
    port: u16,
    grace_period: Duration,
    router: Router,
    lifecycle: Lifecycle,
    /// Cancelled by `stop`; starts graceful shutdown of the serving loop.
    shutdown: CancellationToken,
    /// Cancelled when the grace period elapses; drops in-flight requests.
    abandon: CancellationToken,
    /// Cancelled by `start` once the serving loop has exited.
    serve_done: CancellationToken,
    local_addr: OnceLock<SocketAddr>,
    stop_outcome: OnceCell<Result<(), ServerError>>,
}

impl Server {
    /// Create a new server in the `Idle` state.
    pub fn new(options: ServerOptions) -> Self {
        let router = Self::build_router(&options);
        Self {
            host: options.host,
            port: options.port,
            grace_period: options.grace_period,
            router,
            lifecycle: Lifecycle::new(),
            shutdown: CancellationToken::new(),
            abandon: CancellationToken::new(),
            serve_done: CancellationToken::new(),
            local_addr: OnceLock::new(),
            stop_outcome: OnceCell::new(),
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(options: &ServerOptions) -> Router {
        let state = AppState {
            newsletter: options.newsletter.clone(),
        };

        handlers::routes(state)
            .layer(DefaultBodyLimit::max(options.max_body_size))
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
                    .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                        let request_id = request
                            .headers()
                            .get(X_REQUEST_ID)
                            .and_then(|v| v.to_str().ok())
                            .unwrap_or("unknown");
                        tracing::info_span!(
                            "request",
                            method = %request.method(),
                            path = %request.uri().path(),
                            request_id = %request_id,
                        )
                    }))
                    .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
                    .layer(TimeoutLayer::new(options.request_timeout)),
            )
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LifecycleState {
        self.lifecycle.current()
    }

    /// Watch lifecycle transitions.
    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.lifecycle.subscribe()
    }

    /// Address the listener is bound to, once `start` has bound it.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr.get().copied()
    }

    /// Bind and serve until stopped.
    ///
    /// Returns an error right away if the socket cannot be bound. Otherwise
    /// returns once the serving loop exits.
    pub async fn start(&self) -> Result<(), ServerError> {
        if let Err(err) = self.lifecycle.advance(LifecycleState::Starting) {
            if err.from == LifecycleState::Stopped && !self.serve_done.is_cancelled() {
                tracing::info!("Server stopped before it started");
                return Ok(());
            }
            return Err(ServerError::InvalidState(err.from));
        }

        self.serve_started().await
    }

    /// Bind and serve from `Starting`, then release any waiting `stop`.
    async fn serve_started(&self) -> Result<(), ServerError> {
        let result = self.serve().await;
        self.serve_done.cancel();
        result
    }

    async fn serve(&self) -> Result<(), ServerError> {
        let addr = format!("{}:{}", self.host, self.port);
        let listener = match TcpListener::bind((self.host.as_str(), self.port)).await {
            Ok(listener) => listener,
            Err(err) => {
                let _ = self.lifecycle.advance(LifecycleState::Failed);
                return Err(ServerError::Bind {
                    addr,
                    source: Arc::new(err),
                });
            }
        };
        let local_addr = listener.local_addr().map_err(|err| {
            let _ = self.lifecycle.advance(LifecycleState::Failed);
            ServerError::Bind {
                addr: addr.clone(),
                source: Arc::new(err),
            }
        })?;
        let _ = self.local_addr.set(local_addr);

        // A stop that arrived while binding keeps the state at Stopping; the
        // loop below then exits straight away.
        if self.lifecycle.advance_from(LifecycleState::Starting, LifecycleState::Running) {
            tracing::info!(address = %local_addr, "HTTP server listening");
        }

        let shutdown = self.shutdown.clone();
        let serving = axum::serve(listener, self.router.clone())
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .into_future();

        let result = tokio::select! {
            result = serving => result,
            _ = self.abandon.cancelled() => {
                tracing::warn!("Grace period elapsed, abandoning in-flight requests");
                Ok(())
            }
        };

        match result {
            Ok(()) => {
                if self.lifecycle.advance_from(LifecycleState::Running, LifecycleState::Stopped) {
                    tracing::info!("Serving loop exited");
                }
                Ok(())
            }
            Err(err) => {
                tracing::error!(error = %err, "Serving loop failed");
                let _ = self.lifecycle.advance(LifecycleState::Failed);
                Err(ServerError::Serve(Arc::new(err)))
            }
        }
    }

    /// Stop accepting connections and wait for in-flight requests.
    ///
    /// Safe to call any number of times, from any state.
    pub async fn stop(&self) -> Result<(), ServerError> {
        self.stop_outcome
            .get_or_init(|| self.shutdown_gracefully())
            .await
            .clone()
    }

    async fn shutdown_gracefully(&self) -> Result<(), ServerError> {
        loop {
            match self.lifecycle.current() {
                LifecycleState::Idle => {
                    if self.lifecycle.advance_from(LifecycleState::Idle, LifecycleState::Stopped) {
                        return Ok(());
                    }
                }
                state @ (LifecycleState::Starting | LifecycleState::Running) => {
                    if self.lifecycle.advance_from(state, LifecycleState::Stopping) {
                        break;
                    }
                }
                LifecycleState::Stopping => break,
                LifecycleState::Stopped | LifecycleState::Failed => {
                    tracing::debug!("Stop requested on a server that is not running");
                    return Ok(());
                }
            }
        }

        tracing::info!(grace_period = ?self.grace_period, "HTTP server stopping");
        self.shutdown.cancel();

        match tokio::time::timeout(self.grace_period, self.serve_done.cancelled()).await {
            Ok(()) => {
                if self
                    .lifecycle
                    .advance_from(LifecycleState::Stopping, LifecycleState::Stopped)
                {
                    tracing::info!("HTTP server stopped");
                } else {
                    // Startup or serving failed while draining; `start` reports it.
                    tracing::warn!(
                        state = %self.lifecycle.current(),
                        "HTTP server failed while stopping"
                    );
                }
                Ok(())
            }
            Err(_) => {
                self.abandon.cancel();
                self.lifecycle
                    .advance_from(LifecycleState::Stopping, LifecycleState::Failed);
                Err(ServerError::GracePeriodElapsed(self.grace_period))
            }
        }
    }
}

#[async_trait]
impl Service for Server {
    type Error = ServerError;

    async fn start(&self) -> Result<(), ServerError> {
        Server::start(self).await
    }

    async fn stop(&self) -> Result<(), ServerError> {
        Server::stop(self).await
    }
}
