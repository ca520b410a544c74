//! vault-bridge server.
//!
//! # Architecture Overview
//!
//! ```text
//!   caller ──submit──▶ ResilientExecutor ──▶ RateLimiter ──▶ CircuitBreaker
//!                            │                                     │
//!                            │ retry timer                         ▼
//!                            └───────────────◀── failure ── active provider
//!                                                            (ProviderRegistry)
//!
//!   ProviderRegistry / economy ops ──publish──▶ EventBus ──▶ subscribers
//!   Supervisor ──tick──▶ SnapshotJob ──▶ SnapshotSink (backup_<millis>.json)
//!   QueryServer (/balance, /status, /health) ──▶ Vault
//! ```

use std::path::PathBuf;

use clap::Parser;

use vault_bridge::config::{load_config, watcher::ConfigWatcher, VaultConfig};
use vault_bridge::lifecycle::{wait_for_signal, VaultBuilder};
use vault_bridge::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "vault-bridge")]
#[command(about = "Resilient economy provider bridge", long_about = None)]
struct Args {
    /// Path to a TOML configuration file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Watch the configuration file and apply priority and safe-mode changes live.
    #[arg(long)]
    watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => VaultConfig::default(),
    };

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "vault-bridge starting");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    tracing::info!(
        providers = config.providers.memory.len(),
        subjects = config.subjects.len(),
        max_retries = config.executor.max_retries,
        listen_port = config.http.listen_port,
        "Configuration loaded"
    );

    let vault = VaultBuilder::from_config(config).build()?;
    vault.connect().await;

    // The watcher stops when dropped, so keep it for the life of the process.
    let _watcher = match (&args.config, args.watch) {
        (Some(path), true) => {
            let (watcher, mut updates) = ConfigWatcher::new(path);
            let watcher = watcher.run()?;
            let vault = vault.clone();
            tokio::spawn(async move {
                while let Some(new_config) = updates.recv().await {
                    vault.apply_config(&new_config);
                }
            });
            Some(watcher)
        }
        (None, true) => {
            tracing::warn!("--watch requires --config, hot reload disabled");
            None
        }
        _ => None,
    };

    let signal = wait_for_signal().await;
    tracing::info!(signal, "Shutdown signal received");

    vault.shutdown().await;
    tracing::info!("Shutdown complete");
    Ok(())
}
