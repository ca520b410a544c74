//! Retry budget for a single submission.
//!
//! # Design Decisions
//! - Only failed provider calls consume the budget
//! - Admission rejections are terminal and never reach the budget
//! - The budget is explicit per-submission state, not captured closure state

use std::time::Duration;

/// Per-submission knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitOptions {
    /// Retries permitted after the first attempt.
    pub max_retries: u32,
    /// No new attempt starts once this much time has passed since submission.
    pub deadline: Option<Duration>,
}

impl SubmitOptions {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            deadline: None,
        }
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

/// Attempts made and retries left for one submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBudget {
    remaining: u32,
    attempts: u32,
}

impl RetryBudget {
    pub fn new(max_retries: u32) -> Self {
        Self {
            remaining: max_retries,
            attempts: 0,
        }
    }

    /// Count a dispatched attempt.
    pub fn record_attempt(&mut self) {
        self.attempts += 1;
    }

    /// Consume one retry after a failed attempt.
    ///
    /// Returns the 1-based retry number, or `None` when the budget is spent.
    pub fn take_retry(&mut self) -> Option<u32> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        Some(self.attempts)
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_allows_one_plus_retries() {
        let mut budget = RetryBudget::new(3);
        let mut retries = Vec::new();
        loop {
            budget.record_attempt();
            match budget.take_retry() {
                Some(n) => retries.push(n),
                None => break,
            }
        }

        assert_eq!(budget.attempts(), 4);
        assert_eq!(retries, vec![1, 2, 3]);
        assert_eq!(budget.remaining(), 0);
    }

    #[test]
    fn test_zero_retries() {
        let mut budget = RetryBudget::new(0);
        budget.record_attempt();
        assert_eq!(budget.take_retry(), None);
        assert_eq!(budget.attempts(), 1);
    }
}
