//! Vault construction.

use std::sync::Arc;
use std::time::Duration;

use crate::config::{validate_config, BackoffKind, ConfigError, VaultConfig};
use crate::events::EventBus;
use crate::maintenance::{JsonFileSink, SnapshotSink};
use crate::provider::{
    Candidate, InMemoryProvider, ProviderRegistry, ServiceDirectory, StaticDirectory, StaticSubjects,
    SubjectDirectory,
};
use crate::resilience::{BackoffStrategy, CircuitBreaker, RateLimiter, ResilientExecutor};
use crate::vault::{Vault, VaultParts};

/// Builder for a [`Vault`].
///
/// Every option defaults to the value of [`VaultConfig::default`].
pub struct VaultBuilder {
    config: VaultConfig,
    directory: Option<Arc<dyn ServiceDirectory>>,
    subjects: Option<Arc<dyn SubjectDirectory>>,
    sink: Option<Arc<dyn SnapshotSink>>,
}

impl VaultBuilder {
    pub fn new() -> Self {
        Self::from_config(VaultConfig::default())
    }

    pub fn from_config(config: VaultConfig) -> Self {
        Self {
            config,
            directory: None,
            subjects: None,
            sink: None,
        }
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.config.executor.max_retries = max_retries;
        self
    }

    /// Fixed delay between attempts (the base delay for exponential backoff).
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        let millis = delay.as_millis() as u64;
        self.config.executor.retry_delay_ms = millis;
        self.config.executor.max_delay_ms = self.config.executor.max_delay_ms.max(millis);
        self
    }

    pub fn backoff(mut self, kind: BackoffKind) -> Self {
        self.config.executor.backoff = kind;
        self
    }

    pub fn deadline(mut self, deadline: Duration) -> Self {
        self.config.executor.deadline_ms = Some(deadline.as_millis() as u64);
        self
    }

    pub fn safe_mode(mut self, enabled: bool) -> Self {
        self.config.safe_mode = enabled;
        self
    }

    pub fn maintenance_interval_secs(mut self, secs: u64) -> Self {
        self.config.maintenance.interval_secs = secs;
        self
    }

    pub fn maintenance_enabled(mut self, enabled: bool) -> Self {
        self.config.maintenance.enabled = enabled;
        self
    }

    pub fn listen_port(mut self, port: u16) -> Self {
        self.config.http.listen_port = port;
        self
    }

    pub fn listen_host(mut self, host: impl Into<String>) -> Self {
        self.config.http.host = host.into();
        self
    }

    pub fn http_enabled(mut self, enabled: bool) -> Self {
        self.config.http.enabled = enabled;
        self
    }

    pub fn provider_priority(mut self, name: &str, priority: i32) -> Self {
        self.config
            .providers
            .priorities
            .insert(name.to_string(), priority);
        self
    }

    pub fn rate_limit(mut self, capacity: u32, window: Duration) -> Self {
        self.config.rate_limit.capacity = capacity;
        self.config.rate_limit.window_ms = window.as_millis() as u64;
        self
    }

    pub fn circuit_breaker(mut self, failure_threshold: u32, cooldown: Duration) -> Self {
        self.config.circuit_breaker.failure_threshold = failure_threshold;
        self.config.circuit_breaker.cooldown_ms = cooldown.as_millis() as u64;
        self
    }

    pub fn backups(mut self, dir: impl Into<String>, max_backups: usize) -> Self {
        self.config.maintenance.backup_dir = dir.into();
        self.config.maintenance.max_backups = max_backups;
        self
    }

    /// Where providers are discovered. Defaults to the in-memory providers
    /// declared in the configuration.
    pub fn directory(mut self, directory: Arc<dyn ServiceDirectory>) -> Self {
        self.directory = Some(directory);
        self
    }

    /// Known subjects. Defaults to the configured subject list.
    pub fn subjects(mut self, subjects: Arc<dyn SubjectDirectory>) -> Self {
        self.subjects = Some(subjects);
        self
    }

    /// Snapshot destination. Defaults to a [`JsonFileSink`] in the backup directory.
    pub fn snapshot_sink(mut self, sink: Arc<dyn SnapshotSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Validate the configuration and assemble the vault.
    pub fn build(self) -> Result<Vault, ConfigError> {
        validate_config(&self.config).map_err(ConfigError::Validation)?;
        let config = self.config;

        let events = EventBus::with_capacity(config.events.buffer);
        let registry = Arc::new(ProviderRegistry::new(events.clone()));
        registry.replace_overrides(&config.providers.priorities);

        let executor = ResilientExecutor::new(
            Arc::new(RateLimiter::new(config.rate_limit.capacity, config.rate_limit.window())),
            Arc::new(CircuitBreaker::new(
                config.circuit_breaker.failure_threshold,
                config.circuit_breaker.cooldown(),
            )),
            registry.clone(),
            BackoffStrategy::from_config(&config.executor),
            config.executor.deadline(),
        );

        let directory = self
            .directory
            .unwrap_or_else(|| Arc::new(memory_directory(&config)));
        let subjects = self
            .subjects
            .unwrap_or_else(|| Arc::new(StaticSubjects::new(config.subjects.iter().cloned())));
        let sink = self.sink.unwrap_or_else(|| {
            Arc::new(JsonFileSink::new(
                &config.maintenance.backup_dir,
                config.maintenance.max_backups,
            ))
        });

        tracing::debug!(
            max_retries = config.executor.max_retries,
            retry_delay_ms = config.executor.retry_delay_ms,
            safe_mode = config.safe_mode,
            "Vault built"
        );

        Ok(Vault::from_parts(VaultParts {
            config,
            events,
            registry,
            executor,
            directory,
            subjects,
            sink,
        }))
    }
}

impl Default for VaultBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Directory of the in-memory providers declared in the configuration.
fn memory_directory(config: &VaultConfig) -> StaticDirectory {
    let candidates = config
        .providers
        .memory
        .iter()
        .map(|p| {
            let provider = InMemoryProvider::with_balances(p.balances.clone());
            let candidate = Candidate::new(p.name.clone(), Arc::new(provider));
            match p.priority {
                Some(priority) => candidate.with_priority(priority),
                None => candidate,
            }
        })
        .collect();
    StaticDirectory::new(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MemoryProviderConfig;

    #[test]
    fn test_build_rejects_invalid_config() {
        let result = VaultBuilder::new().rate_limit(0, Duration::from_secs(1)).build();
        match result {
            Err(ConfigError::Validation(errors)) => {
                assert!(errors.iter().any(|e| e.field == "rate_limit.capacity"));
            }
            _ => panic!("expected a validation error"),
        }
    }

    #[test]
    fn test_retry_delay_raises_max_delay() {
        let builder = VaultBuilder::new().retry_delay(Duration::from_secs(120));
        assert_eq!(builder.config.executor.retry_delay_ms, 120_000);
        assert_eq!(builder.config.executor.max_delay_ms, 120_000);
    }

    #[test]
    fn test_memory_directory_from_config() {
        let mut config = VaultConfig::default();
        config.providers.memory.push(MemoryProviderConfig {
            name: "Essentials".into(),
            priority: Some(4),
            balances: [("alice".to_string(), 3.0)].into_iter().collect(),
        });

        let candidates = memory_directory(&config).candidates();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].priority_hint, Some(4));
        assert_eq!(candidates[0].handle.balance("alice").unwrap(), 3.0);
    }

    #[tokio::test]
    async fn test_builder_priority_applies_on_connect() {
        let vault = VaultBuilder::new()
            .http_enabled(false)
            .maintenance_enabled(false)
            .provider_priority("Beta", 9)
            .directory(Arc::new(StaticDirectory::new(vec![
                Candidate::new("alpha", Arc::new(InMemoryProvider::new())).with_priority(5),
                Candidate::new("beta", Arc::new(InMemoryProvider::new())),
            ])))
            .build()
            .unwrap();

        vault.connect().await;
        assert_eq!(vault.registry().active_name().as_deref(), Some("beta"));
        vault.shutdown().await;
    }
}
