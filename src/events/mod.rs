//! Event notification subsystem.
//!
//! # Data Flow
//! ```text
//! Producers (registry discovery, lifecycle, economy operations)
//!     → bus.rs publish (non-blocking, buffered per subscriber)
//!     → EventStream per subscriber (publish order preserved)
//!     → exhaustive match on VaultEvent at the consumer
//! ```

pub mod bus;
pub mod event;

pub use bus::{EventBus, EventStream, DEFAULT_BUS_CAPACITY};
pub use event::VaultEvent;
