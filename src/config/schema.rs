//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the vault.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the vault.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct VaultConfig {
    /// Advisory flag, reported on status and logged at connect.
    pub safe_mode: bool,

    /// Retry behaviour of the executor.
    pub executor: ExecutorConfig,

    /// Fixed-window admission gate.
    pub rate_limit: RateLimitConfig,

    /// Circuit breaker thresholds.
    pub circuit_breaker: CircuitBreakerConfig,

    /// Periodic balance snapshots.
    pub maintenance: MaintenanceConfig,

    /// Query endpoint.
    pub http: HttpConfig,

    /// Provider priorities and locally hosted providers.
    pub providers: ProvidersConfig,

    /// Subjects known to the host (used by snapshots and the query endpoint).
    pub subjects: Vec<String>,

    /// Event bus settings.
    pub events: EventsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            safe_mode: true,
            executor: ExecutorConfig::default(),
            rate_limit: RateLimitConfig::default(),
            circuit_breaker: CircuitBreakerConfig::default(),
            maintenance: MaintenanceConfig::default(),
            http: HttpConfig::default(),
            providers: ProvidersConfig::default(),
            subjects: Vec::new(),
            events: EventsConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Delay strategy between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackoffKind {
    /// Same delay before every retry.
    #[default]
    Fixed,
    /// Doubling delay with jitter, capped at `max_delay_ms`.
    Exponential,
}

/// Executor retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Retries after the first attempt.
    pub max_retries: u32,

    /// Delay before each retry in milliseconds.
    pub retry_delay_ms: u64,

    /// Delay strategy.
    pub backoff: BackoffKind,

    /// Cap for exponential backoff in milliseconds.
    pub max_delay_ms: u64,

    /// Default per-submission deadline in milliseconds (none when unset).
    pub deadline_ms: Option<u64>,
}

impl ExecutorConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_ms.map(Duration::from_millis)
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            retry_delay_ms: 5_000,
            backoff: BackoffKind::Fixed,
            max_delay_ms: 60_000,
            deadline_ms: None,
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Admissions per window.
    pub capacity: u32,

    /// Window length in milliseconds.
    pub window_ms: u64,
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            capacity: 100,
            window_ms: 1_000,
        }
    }
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Failures before the circuit opens.
    pub failure_threshold: u32,

    /// Time after the last failure before the circuit closes again, in milliseconds.
    pub cooldown_ms: u64,
}

impl CircuitBreakerConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            cooldown_ms: 10_000,
        }
    }
}

/// Periodic maintenance configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MaintenanceConfig {
    /// Enable periodic snapshots.
    pub enabled: bool,

    /// Snapshot interval in seconds.
    pub interval_secs: u64,

    /// Directory receiving snapshot files.
    pub backup_dir: String,

    /// Number of snapshot files kept.
    pub max_backups: usize,
}

impl MaintenanceConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 300,
            backup_dir: "backups".to_string(),
            max_backups: 10,
        }
    }
}

/// Query endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Start the query endpoint on connect.
    pub enabled: bool,

    /// Bind host.
    pub host: String,

    /// Listen port.
    pub listen_port: u16,

    /// Request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl HttpConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.listen_port)
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "0.0.0.0".to_string(),
            listen_port: 8080,
            request_timeout_secs: 10,
        }
    }
}

/// Provider configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProvidersConfig {
    /// Priority overrides by provider name (applied over discovery hints).
    pub priorities: BTreeMap<String, i32>,

    /// In-memory providers hosted by the binary itself.
    pub memory: Vec<MemoryProviderConfig>,
}

/// An in-memory provider advertised by the binary's service directory.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MemoryProviderConfig {
    /// Provider name.
    pub name: String,

    /// Priority hint used when no override exists.
    #[serde(default)]
    pub priority: Option<i32>,

    /// Opening balances.
    #[serde(default)]
    pub balances: BTreeMap<String, f64>,
}

/// Event bus configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EventsConfig {
    /// Per-subscriber buffer.
    pub buffer: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self { buffer: 1024 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Multi-line human readable logs instead of compact lines.
    pub pretty_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            pretty_logs: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
