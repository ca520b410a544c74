//! The vault context.
//!
//! # Responsibilities
//! - Own every component of one vault instance (no process-wide state)
//! - Drive the ordered connect and shutdown sequences
//! - Front the executor for economy operations
//!
//! # Design Decisions
//! - `connect` and `shutdown` are idempotent and never return errors; failures
//!   are logged and the vault keeps whatever parts did start
//! - A vault that has been shut down cannot be connected again
//! - Only priorities and safe mode are applied on a live config reload

pub mod economy;
pub mod status;

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub use status::{ProviderStatus, VaultStatus};

use crate::config::VaultConfig;
use crate::events::{EventBus, EventStream, VaultEvent};
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::startup::{self, RunningServer};
use crate::maintenance::{SnapshotJob, SnapshotSink};
use crate::provider::{EconomyProvider, ProviderError, ProviderRegistry, ServiceDirectory, SubjectDirectory};
use crate::resilience::{ResilientExecutor, SubmissionHandle, SubmitOptions, Supervisor};

const SERVER_STOP_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Idle,
    Connected,
    Stopped,
}

/// Everything a vault is assembled from.
pub(crate) struct VaultParts {
    pub config: VaultConfig,
    pub events: EventBus,
    pub registry: Arc<ProviderRegistry>,
    pub executor: ResilientExecutor,
    pub directory: Arc<dyn ServiceDirectory>,
    pub subjects: Arc<dyn SubjectDirectory>,
    pub sink: Arc<dyn SnapshotSink>,
}

struct VaultInner {
    config: VaultConfig,
    safe_mode: AtomicBool,
    connected: AtomicBool,
    lifecycle: tokio::sync::Mutex<Lifecycle>,
    events: EventBus,
    registry: Arc<ProviderRegistry>,
    executor: ResilientExecutor,
    directory: Arc<dyn ServiceDirectory>,
    subjects: Arc<dyn SubjectDirectory>,
    sink: Arc<dyn SnapshotSink>,
    supervisor: Supervisor,
    server_shutdown: Shutdown,
    server: Mutex<Option<RunningServer>>,
}

/// A resilient front for the active economy provider.
///
/// Cheap to clone; clones share the same context.
#[derive(Clone)]
pub struct Vault {
    inner: Arc<VaultInner>,
}

impl Vault {
    pub(crate) fn from_parts(parts: VaultParts) -> Self {
        Self {
            inner: Arc::new(VaultInner {
                safe_mode: AtomicBool::new(parts.config.safe_mode),
                config: parts.config,
                connected: AtomicBool::new(false),
                lifecycle: tokio::sync::Mutex::new(Lifecycle::Idle),
                events: parts.events,
                registry: parts.registry,
                executor: parts.executor,
                directory: parts.directory,
                subjects: parts.subjects,
                sink: parts.sink,
                supervisor: Supervisor::new(),
                server_shutdown: Shutdown::new(),
                server: Mutex::new(None),
            }),
        }
    }

    /// Discover providers, start maintenance and the query endpoint, select
    /// the active provider and announce it.
    pub async fn connect(&self) {
        let mut lifecycle = self.inner.lifecycle.lock().await;
        match *lifecycle {
            Lifecycle::Connected => {
                tracing::debug!("Vault already connected");
                return;
            }
            Lifecycle::Stopped => {
                tracing::warn!("Vault was shut down and cannot be connected again");
                return;
            }
            Lifecycle::Idle => {}
        }

        let config = &self.inner.config;
        tracing::info!(safe_mode = self.safe_mode(), "Connecting vault");

        startup::discover_providers(&self.inner.registry, self.inner.directory.as_ref());

        if config.maintenance.enabled {
            let job = SnapshotJob::new(
                self.inner.registry.clone(),
                self.inner.subjects.clone(),
                self.inner.sink.clone(),
            );
            startup::schedule_snapshots(&self.inner.supervisor, job, config.maintenance.interval());
        }

        if config.http.enabled {
            match startup::start_query_server(self.clone(), &config.http, self.inner.server_shutdown.subscribe()).await {
                Ok(server) => {
                    *self.inner.server.lock().unwrap_or_else(|p| p.into_inner()) = Some(server);
                }
                Err(e) => tracing::error!(error = %e, "Query endpoint failed to start, continuing without it"),
            }
        }

        let active = self.inner.registry.select_active();
        self.inner.events.publish(VaultEvent::ProviderConnected { provider: active.clone() });

        self.inner.connected.store(true, Ordering::SeqCst);
        *lifecycle = Lifecycle::Connected;
        tracing::info!(provider = ?active, "Vault connected");
    }

    /// Stop the endpoint and scheduled work, refuse new submissions, close the
    /// event bus and forget the providers.
    pub async fn shutdown(&self) {
        let mut lifecycle = self.inner.lifecycle.lock().await;
        if *lifecycle == Lifecycle::Stopped {
            tracing::debug!("Vault already shut down");
            return;
        }
        let was_connected = *lifecycle == Lifecycle::Connected;
        tracing::info!("Shutting down vault");

        self.inner.server_shutdown.trigger();
        let server = self
            .inner
            .server
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .take();
        if let Some(mut server) = server {
            match tokio::time::timeout(SERVER_STOP_TIMEOUT, &mut server.handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::warn!(error = %e, "Query endpoint task ended abnormally"),
                Err(_) => {
                    tracing::warn!("Query endpoint did not stop in time, aborting");
                    server.handle.abort();
                }
            }
        }

        self.inner.supervisor.stop();
        self.inner.executor.close();

        if was_connected {
            self.inner.events.publish(VaultEvent::ProviderDisconnected);
        }
        self.inner.events.shutdown();
        self.inner.registry.clear();

        self.inner.connected.store(false, Ordering::SeqCst);
        *lifecycle = Lifecycle::Stopped;
        tracing::info!("Vault shut down");
    }

    pub fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::SeqCst)
    }

    /// Submit an operation with the configured retry budget.
    pub fn submit<T, F>(&self, op: F) -> SubmissionHandle<T>
    where
        F: Fn(&dyn EconomyProvider) -> Result<T, ProviderError> + Send + Sync + 'static,
        T: Send + 'static,
    {
        self.inner
            .executor
            .submit(op, self.inner.config.executor.max_retries)
    }

    pub fn submit_with<T, F>(&self, op: F, options: SubmitOptions) -> SubmissionHandle<T>
    where
        F: Fn(&dyn EconomyProvider) -> Result<T, ProviderError> + Send + Sync + 'static,
        T: Send + 'static,
    {
        self.inner.executor.submit_with(op, options)
    }

    /// Subscribe to vault events. Only events published from now on are seen.
    pub fn events(&self) -> EventStream {
        self.inner.events.subscribe()
    }

    /// Set a priority override. After connect, the active provider is reselected.
    pub fn set_provider_priority(&self, name: &str, priority: i32) {
        self.inner.registry.set_priority(name, priority);
        if self.is_connected() {
            self.inner.registry.reprioritize();
        }
    }

    /// Apply the live-reloadable parts of a new configuration.
    pub fn apply_config(&self, config: &VaultConfig) {
        self.inner
            .registry
            .replace_overrides(&config.providers.priorities);

        let previous = self.inner.safe_mode.swap(config.safe_mode, Ordering::SeqCst);
        if previous != config.safe_mode {
            tracing::info!(safe_mode = config.safe_mode, "Safe mode changed");
        }
        if self.is_connected() {
            self.inner.registry.reprioritize();
        }
        tracing::info!(
            overrides = config.providers.priorities.len(),
            "Configuration reloaded; other changes take effect on restart"
        );
    }

    pub fn status(&self) -> VaultStatus {
        let set = self.inner.registry.snapshot();
        let active = set.active_name().map(str::to_string);
        let providers = set
            .iter()
            .map(|entry| ProviderStatus {
                name: entry.name.clone(),
                priority: entry.priority,
                live_usage: entry.live_usage(),
                active: active.as_deref() == Some(entry.name.as_str()),
            })
            .collect();

        VaultStatus {
            version: env!("CARGO_PKG_VERSION"),
            connected: self.is_connected(),
            safe_mode: self.safe_mode(),
            active_provider: active,
            providers,
            circuit_breaker: self.inner.executor.breaker().snapshot(),
            rate_limit_remaining: self.inner.executor.limiter().remaining(),
        }
    }

    pub fn safe_mode(&self) -> bool {
        self.inner.safe_mode.load(Ordering::SeqCst)
    }

    /// Address of the running query endpoint, if any.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.inner
            .server
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .as_ref()
            .map(|s| s.addr)
    }

    pub fn config(&self) -> &VaultConfig {
        &self.inner.config
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.inner.events
    }

    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.inner.registry
    }

    pub fn executor(&self) -> &ResilientExecutor {
        &self.inner.executor
    }

    pub fn subjects(&self) -> &Arc<dyn SubjectDirectory> {
        &self.inner.subjects
    }

    pub fn supervisor(&self) -> &Supervisor {
        &self.inner.supervisor
    }
}
