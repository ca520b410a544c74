//! Query endpoint subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, trace + timeout layers)
//!     → handlers.rs (balance, status, health)
//!     → Vault (read-only queries)
//! ```

pub mod handlers;
pub mod server;

pub use server::{AppState, QueryServer};
