//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use newsletter::lifecycle::LifecycleState;
use newsletter::storage::{Newsletter, SubscriberStore};
use newsletter::{Server, ServerOptions};

/// Options for a server on 127.0.0.1 backed by `store`.
pub fn server_options(port: u16, store: Arc<dyn SubscriberStore>) -> ServerOptions {
    ServerOptions {
        host: "127.0.0.1".to_string(),
        port,
        grace_period: Duration::from_secs(2),
        request_timeout: Duration::from_secs(5),
        max_body_size: 16 * 1024,
        newsletter: Newsletter::new(store),
    }
}

/// Wait until the server is `Running` and return its bound address.
pub async fn wait_until_running(server: &Server) -> SocketAddr {
    let mut states = server.subscribe();
    tokio::time::timeout(
        Duration::from_secs(5),
        states.wait_for(|state| *state == LifecycleState::Running),
    )
    .await
    .expect("server did not reach Running")
    .expect("lifecycle channel closed");
    server.local_addr().expect("running server has an address")
}

/// Start `server` in the background and return its address.
#[allow(dead_code)]
pub async fn spawn_server(
    server: Arc<Server>,
) -> (SocketAddr, tokio::task::JoinHandle<Result<(), newsletter::http::ServerError>>) {
    let handle = {
        let server = Arc::clone(&server);
        tokio::spawn(async move { server.start().await })
    };
    let addr = wait_until_running(&server).await;
    (addr, handle)
}

/// HTTP client that does not follow redirects.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
