//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Submission:
//!     → executor.rs (one driver task per submission)
//!     → rate_limiter.rs (fixed-window admission, rejection is terminal)
//!     → circuit_breaker.rs (consecutive-failure gate, rejection is terminal)
//!     → active provider on a blocking worker
//!     → On failure: retries.rs (budget) + backoff.rs (delay), bounded by timeouts.rs
//! ```
//!
//! # Design Decisions
//! - Gates are checked per attempt, in a fixed order: limiter, then breaker
//! - Retry waits are timers, never parked worker threads
//! - supervisor.rs owns the periodic maintenance tasks

pub mod backoff;
pub mod circuit_breaker;
pub mod executor;
pub mod rate_limiter;
pub mod retries;
pub mod supervisor;
pub mod timeouts;

pub use backoff::BackoffStrategy;
pub use circuit_breaker::{BreakerSnapshot, CircuitBreaker, CircuitState};
pub use executor::{ResilientExecutor, SubmissionHandle};
pub use rate_limiter::RateLimiter;
pub use retries::SubmitOptions;
pub use supervisor::{Supervisor, TaskError};
