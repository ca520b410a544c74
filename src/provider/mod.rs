//! Economy provider subsystem.
//!
//! # Data Flow
//! ```text
//! Host service directory (directory.rs)
//!     → candidates (name, priority hint, handle)
//!     → registry.rs (apply priority overrides, copy-on-write swap)
//!     → select_active (highest priority, lexical tie-break)
//!     → entry.rs (lease with live-usage counter)
//!     → EconomyProvider call on a blocking worker
//! ```
//!
//! # Design Decisions
//! - Provider calls are blocking; the executor moves them off the async runtime
//! - The provider set is replaced wholesale on discovery, never edited in place
//! - Names are lower-cased so overrides and discovery agree on keys

pub mod directory;
pub mod entry;
pub mod memory;
pub mod registry;

use thiserror::Error;

pub use directory::{Candidate, ServiceDirectory, StaticDirectory, StaticSubjects, SubjectDirectory};
pub use entry::{ProviderEntry, ProviderLease};
pub use memory::InMemoryProvider;
pub use registry::{ProviderRegistry, ProviderSet, DEFAULT_PRIORITY};

/// Errors raised by a provider call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProviderError {
    /// The backend threw or could not be reached.
    #[error("backend error: {0}")]
    Backend(String),

    /// The backend answered but reported an unsuccessful transaction.
    #[error("transaction declined: {0}")]
    Declined(String),

    /// The operation panicked on the worker.
    #[error("operation panicked: {0}")]
    Panicked(String),
}

/// Capability exposed by an economy backend.
///
/// All methods are blocking.
pub trait EconomyProvider: Send + Sync {
    /// Current balance of `subject`.
    fn balance(&self, subject: &str) -> Result<f64, ProviderError>;

    /// Credit `amount` to `subject`. Returns the backend's success flag.
    fn deposit(&self, subject: &str, amount: f64) -> Result<bool, ProviderError>;

    /// Debit `amount` from `subject`. Returns the backend's success flag.
    fn withdraw(&self, subject: &str, amount: f64) -> Result<bool, ProviderError>;
}

/// Normalize a provider name into its registry key.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}
