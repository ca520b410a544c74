//! Vault event types.

use serde::Serialize;

/// A state change broadcast on the event bus.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VaultEvent {
    /// The vault connected; `provider` is the active provider, if any.
    ProviderConnected { provider: Option<String> },
    /// The vault shut down.
    ProviderDisconnected,
    /// Discovery or connection failed. The vault stays usable in degraded mode.
    ProviderConnectionFailed { cause: String },
    /// A subject's balance changed through the vault.
    BalanceChanged {
        subject: String,
        old_balance: f64,
        new_balance: f64,
    },
}

impl VaultEvent {
    /// Stable short name, used as a metrics label.
    pub fn kind(&self) -> &'static str {
        match self {
            VaultEvent::ProviderConnected { .. } => "provider_connected",
            VaultEvent::ProviderDisconnected => "provider_disconnected",
            VaultEvent::ProviderConnectionFailed { .. } => "provider_connection_failed",
            VaultEvent::BalanceChanged { .. } => "balance_changed",
        }
    }
}
