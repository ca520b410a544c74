//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Build (builder.rs):
//!     VaultConfig / builder options → Validate → Vault context
//!
//! Connect (startup.rs):
//!     Discover → Schedule maintenance → Start query endpoint
//!     → Select active provider → Publish ProviderConnected
//!
//! Shutdown (Vault::shutdown, shutdown.rs):
//!     Stop endpoint → Stop scheduled work → Close executor
//!     → Publish ProviderDisconnected → Close event bus → Clear registry
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: providers first, then background work, then listeners
//! - Shutdown never propagates errors; each step is logged and the next runs

pub mod builder;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use builder::VaultBuilder;
pub use shutdown::{Shutdown, ShutdownSignal};
pub use signals::wait_for_signal;
