//! Signup endpoint tests against a running server.

use std::sync::Arc;

use async_trait::async_trait;
use newsletter::storage::{MemoryStore, StoreError, SubscriberStore};
use newsletter::Server;

mod common;

struct DownStore;

#[async_trait]
impl SubscriberStore for DownStore {
    async fn insert(&self, _email: &str, _token: &str) -> Result<(), StoreError> {
        Err(StoreError::Backend("connection refused".into()))
    }

    async fn refresh_token(&self, _email: &str, _token: &str) -> Result<(), StoreError> {
        Err(StoreError::Backend("connection refused".into()))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Err(StoreError::Backend("connection refused".into()))
    }
}

fn is_token(s: &str) -> bool {
    s.len() == 64 && s.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f'))
}

#[tokio::test]
async fn test_signup_redirects_and_stores() {
    let store = MemoryStore::new();
    let server = Arc::new(Server::new(common::server_options(0, Arc::new(store.clone()))));
    let (addr, running) = common::spawn_server(server.clone()).await;
    let client = common::client();

    let res = client
        .post(format!("http://{}/newsletter/signup", addr))
        .form(&[("email", "Me@Example.com")])
        .send()
        .await
        .expect("server unreachable");

    assert_eq!(res.status(), 303);
    assert_eq!(res.headers()["location"], "/newsletter/thanks");
    assert!(res.headers().contains_key("x-request-id"));

    let row = store.get("Me@Example.com").expect("row stored");
    assert!(is_token(&row.token));
    assert!(store.get("me@example.com").is_none(), "email case must be preserved");

    server.stop().await.unwrap();
    running.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_repeat_signup_keeps_one_row() {
    let store = MemoryStore::new();
    let server = Arc::new(Server::new(common::server_options(0, Arc::new(store.clone()))));
    let (addr, running) = common::spawn_server(server.clone()).await;
    let client = common::client();
    let url = format!("http://{}/newsletter/signup", addr);

    client.post(&url).form(&[("email", "me@example.com")]).send().await.unwrap();
    let first = store.get("me@example.com").unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    client.post(&url).form(&[("email", "me@example.com")]).send().await.unwrap();
    let second = store.get("me@example.com").unwrap();

    assert_eq!(store.len(), 1);
    assert_ne!(first.token, second.token);
    assert!(second.updated > first.updated);

    server.stop().await.unwrap();
    running.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_invalid_email_is_rejected() {
    let store = MemoryStore::new();
    let server = Arc::new(Server::new(common::server_options(0, Arc::new(store.clone()))));
    let (addr, running) = common::spawn_server(server.clone()).await;
    let client = common::client();

    let res = client
        .post(format!("http://{}/newsletter/signup", addr))
        .form(&[("email", "not-an-email")])
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 400);
    assert!(store.is_empty());

    server.stop().await.unwrap();
    running.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_store_failure_is_bad_gateway() {
    let server = Arc::new(Server::new(common::server_options(0, Arc::new(DownStore))));
    let (addr, running) = common::spawn_server(server.clone()).await;
    let client = common::client();

    let res = client
        .post(format!("http://{}/newsletter/signup", addr))
        .form(&[("email", "me@example.com")])
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 502);

    let health = client
        .get(format!("http://{}/health", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(health.status(), 503);

    server.stop().await.unwrap();
    running.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_thanks_and_health_pages() {
    let server = Arc::new(Server::new(common::server_options(0, Arc::new(MemoryStore::new()))));
    let (addr, running) = common::spawn_server(server.clone()).await;
    let client = common::client();

    let thanks = client
        .get(format!("http://{}/newsletter/thanks", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(thanks.status(), 200);
    assert!(thanks.text().await.unwrap().contains("Thanks"));

    let health = client
        .get(format!("http://{}/health", addr))
        .header("x-request-id", "probe-1")
        .send()
        .await
        .unwrap();
    assert_eq!(health.status(), 200);
    assert_eq!(health.headers()["x-request-id"], "probe-1");
    let body: serde_json::Value = serde_json::from_str(&health.text().await.unwrap()).unwrap();
    assert_eq!(body["status"], "ok");

    server.stop().await.unwrap();
    running.await.unwrap().unwrap();
}
