//! End-to-end lifecycle tests: coordinator, server and shutdown token.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use newsletter::http::ServerError;
use newsletter::lifecycle::{exit_code, Coordinator, LifecycleError, LifecycleState, EXIT_FAILURE, EXIT_SUCCESS};
use newsletter::storage::{MemoryStore, StoreError, SubscriberStore};
use newsletter::Server;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

mod common;

/// Store whose inserts hang, to keep a request in flight.
struct SlowStore {
    entered: Arc<Notify>,
}

#[async_trait]
impl SubscriberStore for SlowStore {
    async fn insert(&self, _email: &str, _token: &str) -> Result<(), StoreError> {
        self.entered.notify_one();
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(())
    }

    async fn refresh_token(&self, _email: &str, _token: &str) -> Result<(), StoreError> {
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[tokio::test]
async fn test_signal_while_running_exits_zero() {
    let server = Arc::new(Server::new(common::server_options(0, Arc::new(MemoryStore::new()))));
    let shutdown = CancellationToken::new();

    let coordinator = {
        let server = Arc::clone(&server);
        let shutdown = shutdown.clone();
        tokio::spawn(async move { Coordinator::new("test").run(server, shutdown).await })
    };

    let addr = common::wait_until_running(&server).await;
    let res = common::client()
        .get(format!("http://{}/health", addr))
        .send()
        .await
        .expect("server unreachable");
    assert_eq!(res.status(), 200);

    shutdown.cancel();
    let outcome = tokio::time::timeout(Duration::from_secs(3), coordinator)
        .await
        .expect("shutdown exceeded grace period")
        .unwrap();

    assert!(outcome.is_ok());
    assert_eq!(exit_code(&outcome), EXIT_SUCCESS);
    assert_eq!(server.state(), LifecycleState::Stopped);
}

#[tokio::test]
async fn test_port_in_use_exits_one_without_signal() {
    let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = taken.local_addr().unwrap().port();

    let server = Arc::new(Server::new(common::server_options(port, Arc::new(MemoryStore::new()))));
    let shutdown = CancellationToken::new();

    let outcome = tokio::time::timeout(
        Duration::from_secs(3),
        Coordinator::new("test").run(Arc::clone(&server), shutdown.clone()),
    )
    .await
    .expect("coordinator waited for a signal");

    assert!(matches!(
        outcome,
        Err(LifecycleError::Start(ref err)) if err.downcast_ref::<ServerError>().map_or(false, |e| matches!(e, ServerError::Bind { .. }))
    ));
    assert_eq!(exit_code(&outcome), EXIT_FAILURE);
    assert_eq!(server.state(), LifecycleState::Failed);
    assert!(!shutdown.is_cancelled());
}

#[tokio::test]
async fn test_stuck_request_fails_shutdown() {
    let entered = Arc::new(Notify::new());
    let mut options = common::server_options(
        0,
        Arc::new(SlowStore {
            entered: Arc::clone(&entered),
        }),
    );
    options.grace_period = Duration::from_millis(200);
    let server = Arc::new(Server::new(options));
    let shutdown = CancellationToken::new();

    let coordinator = {
        let server = Arc::clone(&server);
        let shutdown = shutdown.clone();
        tokio::spawn(async move { Coordinator::new("test").run(server, shutdown).await })
    };
    let addr = common::wait_until_running(&server).await;

    tokio::spawn(async move {
        let _ = common::client()
            .post(format!("http://{}/newsletter/signup", addr))
            .form(&[("email", "slow@example.com")])
            .send()
            .await;
    });
    tokio::time::timeout(Duration::from_secs(3), entered.notified())
        .await
        .expect("request never reached the store");

    shutdown.cancel();
    let outcome = tokio::time::timeout(Duration::from_secs(3), coordinator)
        .await
        .expect("coordinator did not abandon the stuck request")
        .unwrap();

    assert!(matches!(outcome, Err(LifecycleError::Stop(_))));
    assert_eq!(exit_code(&outcome), EXIT_FAILURE);
    assert_eq!(server.state(), LifecycleState::Failed);
}

#[tokio::test]
async fn test_repeated_signals_stop_once() {
    let server = Arc::new(Server::new(common::server_options(0, Arc::new(MemoryStore::new()))));
    let shutdown = CancellationToken::new();

    let coordinator = {
        let server = Arc::clone(&server);
        let shutdown = shutdown.clone();
        tokio::spawn(async move { Coordinator::new("test").run(server, shutdown).await })
    };
    common::wait_until_running(&server).await;

    shutdown.cancel();
    shutdown.cancel();
    let outcome = tokio::time::timeout(Duration::from_secs(3), coordinator)
        .await
        .unwrap()
        .unwrap();
    assert!(outcome.is_ok());

    // A late stop returns the same outcome.
    assert!(server.stop().await.is_ok());
    assert_eq!(server.state(), LifecycleState::Stopped);
}
