//! HTTP query endpoint over a live vault.

use std::sync::Arc;

use serde_json::Value;
use vault_bridge::provider::{InMemoryProvider, StaticSubjects};
use vault_bridge::Vault;

mod common;
use common::{quiet_builder, single, FlakyProvider};

async fn serve(provider: Arc<dyn vault_bridge::EconomyProvider>) -> (Vault, String) {
    let vault = quiet_builder()
        .http_enabled(true)
        .listen_host("127.0.0.1")
        .listen_port(0)
        .directory(single("memory", provider))
        .subjects(Arc::new(StaticSubjects::new(["alice", "bob"])))
        .build()
        .unwrap();
    vault.connect().await;
    let addr = vault.local_addr().expect("query endpoint should be running");
    (vault, format!("http://{}", addr))
}

#[tokio::test]
async fn test_balance_status_codes() {
    let provider = Arc::new(InMemoryProvider::with_balances([("alice", 12.5)]));
    let (vault, base) = serve(provider).await;
    let client = reqwest::Client::new();

    let res = client.get(format!("{}/balance", base)).send().await.unwrap();
    assert_eq!(res.status(), 400);

    let res = client
        .get(format!("{}/balance?subject=mallory", base))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 404);

    let res = client
        .get(format!("{}/balance?subject=alice", base))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["subject"], "alice");
    assert_eq!(body["balance"], 12.5);

    vault.shutdown().await;
}

#[tokio::test]
async fn test_balance_defaults_to_zero_on_error() {
    let (vault, base) = serve(Arc::new(FlakyProvider::broken())).await;

    let body: Value = reqwest::get(format!("{}/balance?subject=bob", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["balance"], 0.0);

    vault.shutdown().await;
}

#[tokio::test]
async fn test_status_and_health() {
    let (vault, base) = serve(Arc::new(InMemoryProvider::new())).await;

    let health: Value = reqwest::get(format!("{}/health", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "ok");

    let status: Value = reqwest::get(format!("{}/status", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["active_provider"], "memory");
    assert_eq!(status["connected"], true);
    assert_eq!(status["circuit_breaker"]["state"], "closed");
    assert_eq!(status["providers"][0]["priority"], 1);

    vault.shutdown().await;
    assert!(reqwest::get(format!("{}/health", base)).await.is_err());
}
