//! Point-in-time view of a vault for monitoring.

use serde::Serialize;

use crate::resilience::BreakerSnapshot;

#[derive(Debug, Clone, Serialize)]
pub struct ProviderStatus {
    pub name: String,
    pub priority: i32,
    pub live_usage: usize,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct VaultStatus {
    pub version: &'static str,
    pub connected: bool,
    pub safe_mode: bool,
    pub active_provider: Option<String>,
    pub providers: Vec<ProviderStatus>,
    pub circuit_breaker: BreakerSnapshot,
    pub rate_limit_remaining: u32,
}
