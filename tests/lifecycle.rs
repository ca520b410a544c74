//! Connect and shutdown sequences, events and live reconfiguration.

use std::sync::Arc;
use std::time::Duration;

use vault_bridge::maintenance::JsonFileSink;
use vault_bridge::provider::{Candidate, InMemoryProvider, StaticDirectory, StaticSubjects};
use vault_bridge::{VaultConfig, VaultError, VaultEvent};

mod common;
use common::quiet_builder;

fn two_providers() -> Arc<StaticDirectory> {
    Arc::new(StaticDirectory::new(vec![
        Candidate::new("alpha", Arc::new(InMemoryProvider::new())).with_priority(5),
        Candidate::new("beta", Arc::new(InMemoryProvider::new())).with_priority(1),
    ]))
}

#[tokio::test]
async fn test_connect_and_shutdown_events() {
    let vault = quiet_builder().directory(two_providers()).build().unwrap();
    let mut events = vault.events();

    vault.connect().await;
    vault.connect().await;
    vault.shutdown().await;
    vault.shutdown().await;

    assert_eq!(
        events.recv().await,
        Some(VaultEvent::ProviderConnected { provider: Some("alpha".into()) })
    );
    assert_eq!(events.recv().await, Some(VaultEvent::ProviderDisconnected));
    assert_eq!(events.recv().await, None);
}

#[tokio::test]
async fn test_shutdown_rejects_new_work() {
    let vault = quiet_builder().directory(two_providers()).build().unwrap();
    vault.connect().await;
    vault.shutdown().await;

    assert!(!vault.is_connected());
    assert!(vault.registry().active().is_none());
    let result = vault.submit(|p| p.balance("alice")).await;
    assert!(matches!(result, Err(VaultError::ShuttingDown)));

    vault.connect().await;
    assert!(!vault.is_connected());
}

#[tokio::test]
async fn test_empty_discovery_keeps_running() {
    let vault = quiet_builder().build().unwrap();
    let mut events = vault.events();
    vault.connect().await;

    assert!(matches!(
        events.recv().await,
        Some(VaultEvent::ProviderConnectionFailed { .. })
    ));
    assert_eq!(
        events.recv().await,
        Some(VaultEvent::ProviderConnected { provider: None })
    );
    assert!(vault.is_connected());
    assert_eq!(vault.balance("alice").await, 0.0);
    vault.shutdown().await;
}

#[tokio::test]
async fn test_priority_change_after_connect_reselects() {
    let vault = quiet_builder().directory(two_providers()).build().unwrap();
    vault.connect().await;
    assert_eq!(vault.registry().active_name().as_deref(), Some("alpha"));

    vault.set_provider_priority("BETA", 10);
    assert_eq!(vault.registry().active_name().as_deref(), Some("beta"));
    vault.shutdown().await;
}

#[tokio::test]
async fn test_apply_config_updates_priorities_and_safe_mode() {
    let vault = quiet_builder().directory(two_providers()).build().unwrap();
    vault.connect().await;
    assert!(vault.safe_mode());

    let mut config = VaultConfig::default();
    config.safe_mode = false;
    config.providers.priorities.insert("beta".into(), 7);
    vault.apply_config(&config);

    assert!(!vault.safe_mode());
    assert_eq!(vault.registry().active_name().as_deref(), Some("beta"));
    let status = vault.status();
    assert_eq!(status.active_provider.as_deref(), Some("beta"));
    assert_eq!(status.providers.len(), 2);
    vault.shutdown().await;
}

#[tokio::test]
async fn test_maintenance_writes_snapshots() {
    let dir = tempfile::tempdir().unwrap();
    let provider = InMemoryProvider::with_balances([("alice", 4.0)]);
    let sink = Arc::new(JsonFileSink::new(dir.path(), 2));
    let vault = quiet_builder()
        .maintenance_enabled(true)
        .maintenance_interval_secs(1)
        .directory(common::single("memory", Arc::new(provider)))
        .subjects(Arc::new(StaticSubjects::new(["alice"])))
        .snapshot_sink(sink.clone())
        .build()
        .unwrap();
    vault.connect().await;

    tokio::time::sleep(Duration::from_millis(3_500)).await;
    vault.shutdown().await;

    assert!(vault.supervisor().run_count("balance_snapshot") >= 3);
    assert_eq!(vault.supervisor().failure_count("balance_snapshot"), 0);
    assert_eq!(sink.backups().unwrap().len(), 2);
}
