//! Resilient orchestration of economy providers.
//!
//! A [`Vault`] discovers economy backends, keeps the highest-priority one
//! active, and runs every operation against it through a rate limiter, a
//! circuit breaker and a retry loop, broadcasting state changes on an
//! event bus.

pub mod config;
pub mod error;
pub mod events;
pub mod http;
pub mod lifecycle;
pub mod maintenance;
pub mod observability;
pub mod provider;
pub mod resilience;
pub mod vault;

pub use config::VaultConfig;
pub use error::{VaultError, VaultResult};
pub use events::{EventBus, EventStream, VaultEvent};
pub use lifecycle::{Shutdown, VaultBuilder};
pub use provider::{Candidate, EconomyProvider, ProviderError, ServiceDirectory, SubjectDirectory};
pub use resilience::{SubmissionHandle, SubmitOptions};
pub use vault::{Vault, VaultStatus};
