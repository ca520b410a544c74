//! Ordered startup steps of a vault.
//!
//! # Responsibilities
//! - Discover providers from the host directory
//! - Schedule periodic maintenance
//! - Bind and spawn the query endpoint

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::config::HttpConfig;
use crate::error::VaultError;
use crate::http::QueryServer;
use crate::lifecycle::shutdown::ShutdownSignal;
use crate::maintenance::{SnapshotJob, SNAPSHOT_TASK};
use crate::provider::{ProviderRegistry, ServiceDirectory};
use crate::resilience::{Supervisor, TaskError};
use crate::vault::Vault;

/// A query endpoint that has been bound and spawned.
pub struct RunningServer {
    pub addr: SocketAddr,
    pub handle: JoinHandle<()>,
}

pub fn discover_providers(registry: &ProviderRegistry, directory: &dyn ServiceDirectory) -> usize {
    let candidates = directory.candidates();
    tracing::debug!(candidates = candidates.len(), "Discovering economy providers");
    registry.discover(candidates)
}

pub fn schedule_snapshots(supervisor: &Supervisor, job: SnapshotJob, interval: Duration) {
    supervisor.spawn_periodic(SNAPSHOT_TASK, interval, move || {
        let job = job.clone();
        async move {
            job.run().await.map(|_| ()).map_err(|e| Box::new(e) as TaskError)
        }
    });
}

/// Bind the query endpoint and serve it until `shutdown` fires.
pub async fn start_query_server(
    vault: Vault,
    config: &HttpConfig,
    shutdown: ShutdownSignal,
) -> Result<RunningServer, VaultError> {
    let bind = config.bind_address();
    let listener = TcpListener::bind(&bind)
        .await
        .map_err(|e| VaultError::Server(format!("failed to bind {}: {}", bind, e)))?;
    let addr = listener.local_addr()?;

    let server = QueryServer::new(vault, config);
    let handle = tokio::spawn(async move {
        if let Err(e) = server.run(listener, shutdown).await {
            tracing::error!(error = %e, "Query endpoint stopped with error");
        }
    });

    Ok(RunningServer { addr, handle })
}
