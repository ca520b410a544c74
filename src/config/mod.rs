//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML) or VaultBuilder
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → VaultConfig (validated)
//!     → owned by the Vault context
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → Vault::apply_config (priorities and safe mode applied live)
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Gate sizes and the listen port are fixed for the lifetime of a Vault

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    BackoffKind, CircuitBreakerConfig, EventsConfig, ExecutorConfig, HttpConfig,
    MaintenanceConfig, MemoryProviderConfig, ObservabilityConfig, ProvidersConfig,
    RateLimitConfig, VaultConfig,
};
pub use validation::{validate_config, ValidationError};
