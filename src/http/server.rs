//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router with all handlers
//! - Wire up middleware (tracing, request timeout)
//! - Serve on a bound listener until the shutdown signal fires

use std::time::Duration;

use axum::{routing::get, Router};
use tokio::net::TcpListener;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::HttpConfig;
use crate::http::handlers;
use crate::lifecycle::shutdown::ShutdownSignal;
use crate::vault::Vault;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub vault: Vault,
}

/// Read-only HTTP endpoint over a vault.
pub struct QueryServer {
    router: Router,
}

impl QueryServer {
    pub fn new(vault: Vault, config: &HttpConfig) -> Self {
        let state = AppState { vault };
        Self {
            router: Self::build_router(config, state),
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &HttpConfig, state: AppState) -> Router {
        Router::new()
            .route("/balance", get(handlers::get_balance))
            .route("/status", get(handlers::get_status))
            .route("/health", get(handlers::get_health))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs)))
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(self, listener: TcpListener, mut shutdown: ShutdownSignal) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "Query endpoint listening");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move { shutdown.recv().await })
            .await?;

        tracing::info!("Query endpoint stopped");
        Ok(())
    }
}
