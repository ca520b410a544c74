//! Error taxonomy for the vault.

use thiserror::Error;

use crate::provider::ProviderError;

/// Errors surfaced to callers of the vault and its executor.
#[derive(Debug, Clone, Error)]
pub enum VaultError {
    /// No provider is currently selected.
    #[error("no active economy provider")]
    NoProviderAvailable,

    /// The rate limiter rejected the attempt.
    #[error("rate limit exceeded")]
    RateLimited,

    /// The circuit breaker is open.
    #[error("circuit breaker is open")]
    CircuitOpen,

    /// The provider call failed on every permitted attempt.
    #[error("operation failed after {attempts} attempt(s): {source}")]
    OperationFailed {
        attempts: u32,
        #[source]
        source: ProviderError,
    },

    /// Discovery found no providers. Warning level; the vault keeps running.
    #[error("no economy providers found")]
    DiscoveryEmpty,

    /// The submission deadline passed before a successful attempt.
    #[error("deadline exceeded after {attempts} attempt(s)")]
    DeadlineExceeded { attempts: u32 },

    /// The caller cancelled the submission.
    #[error("submission cancelled")]
    Cancelled,

    /// The executor no longer accepts work.
    #[error("vault is shutting down")]
    ShuttingDown,

    /// The submission was made with no Tokio runtime to drive it.
    #[error("no Tokio runtime available to run the submission")]
    NoRuntime,

    /// Listener or filesystem error during startup.
    #[error("I/O error: {0}")]
    Io(String),

    /// The query server failed to bind or serve.
    #[error("query server error: {0}")]
    Server(String),
}

impl VaultError {
    /// True for the admission-gate rejections, which are never retried.
    pub fn is_admission_rejection(&self) -> bool {
        matches!(self, VaultError::RateLimited | VaultError::CircuitOpen)
    }
}

impl From<std::io::Error> for VaultError {
    fn from(e: std::io::Error) -> Self {
        VaultError::Io(e.to_string())
    }
}

/// Result type for vault operations.
pub type VaultResult<T> = Result<T, VaultError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = VaultError::OperationFailed {
            attempts: 4,
            source: ProviderError::Backend("connection reset".into()),
        };
        assert_eq!(
            err.to_string(),
            "operation failed after 4 attempt(s): backend error: connection reset"
        );
        assert_eq!(VaultError::RateLimited.to_string(), "rate limit exceeded");
    }

    #[test]
    fn test_admission_rejection() {
        assert!(VaultError::RateLimited.is_admission_rejection());
        assert!(VaultError::CircuitOpen.is_admission_rejection());
        assert!(!VaultError::NoProviderAvailable.is_admission_rejection());
    }
}
