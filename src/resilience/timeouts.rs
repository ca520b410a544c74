//! Per-submission deadlines.
//!
//! Deadlines are cooperative: they are checked between attempts and bound
//! retry waits, but never interrupt an attempt already running on a worker.

use std::time::Duration;

use tokio::time::{sleep_until, Instant};

/// Optional point in time after which no new attempt starts.
#[derive(Debug, Clone, Copy, Default)]
pub struct Deadline {
    at: Option<Instant>,
}

impl Deadline {
    pub fn none() -> Self {
        Self { at: None }
    }

    pub fn after(timeout: Option<Duration>) -> Self {
        Self {
            at: timeout.map(|t| Instant::now() + t),
        }
    }

    pub fn is_expired(&self) -> bool {
        self.at.is_some_and(|at| Instant::now() >= at)
    }

    /// Resolves when the deadline passes; never resolves without one.
    pub async fn expired(&self) {
        match self.at {
            Some(at) => sleep_until(at).await,
            None => std::future::pending().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_deadline_never_expires() {
        assert!(!Deadline::none().is_expired());
        assert!(!Deadline::after(None).is_expired());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expires_after_timeout() {
        let deadline = Deadline::after(Some(Duration::from_secs(3)));
        assert!(!deadline.is_expired());

        deadline.expired().await;
        assert!(deadline.is_expired());
    }
}
