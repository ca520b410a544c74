//! Metrics collection and exposition.
//!
//! # Metrics
//! - `vault_submissions_total` (counter): resolved submissions by outcome
//! - `vault_attempts_total` (counter): attempts dispatched to a provider
//! - `vault_admission_rejected_total` (counter): rejections by gate
//! - `vault_circuit_open` (gauge): 1=open, 0=closed
//! - `vault_events_published_total` (counter): events by kind
//! - `vault_events_lagged_total` (counter): events skipped by slow subscribers
//! - `vault_maintenance_runs_total` (counter): periodic task runs by task, result
//! - `vault_registered_providers` (gauge): size of the current provider set

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter listening on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_submission(outcome: &'static str) {
    metrics::counter!("vault_submissions_total", "outcome" => outcome).increment(1);
}

pub fn record_attempt(provider: &str) {
    metrics::counter!("vault_attempts_total", "provider" => provider.to_string()).increment(1);
}

pub fn record_admission_rejected(gate: &'static str) {
    metrics::counter!("vault_admission_rejected_total", "gate" => gate).increment(1);
}

pub fn record_circuit_state(open: bool) {
    metrics::gauge!("vault_circuit_open").set(if open { 1.0 } else { 0.0 });
}

pub fn record_event_published(kind: &'static str) {
    metrics::counter!("vault_events_published_total", "kind" => kind).increment(1);
}

pub fn record_events_lagged(skipped: u64) {
    metrics::counter!("vault_events_lagged_total").increment(skipped);
}

pub fn record_maintenance_run(task: &str, ok: bool) {
    let result = if ok { "ok" } else { "error" };
    metrics::counter!(
        "vault_maintenance_runs_total",
        "task" => task.to_string(),
        "result" => result
    )
    .increment(1);
}

pub fn record_registered_providers(count: usize) {
    metrics::gauge!("vault_registered_providers").set(count as f64);
}
