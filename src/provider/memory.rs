//! In-memory reference provider.

use dashmap::DashMap;

use crate::provider::{EconomyProvider, ProviderError};

/// A provider that keeps balances in a concurrent map.
///
/// Unknown subjects have a zero balance. Withdrawals that would overdraw
/// report an unsuccessful transaction.
#[derive(Debug, Default)]
pub struct InMemoryProvider {
    balances: DashMap<String, f64>,
}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a provider pre-seeded with balances.
    pub fn with_balances<I, S>(balances: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let provider = Self::new();
        for (subject, amount) in balances {
            provider.balances.insert(subject.into(), amount);
        }
        provider
    }

    pub fn accounts(&self) -> usize {
        self.balances.len()
    }
}

impl EconomyProvider for InMemoryProvider {
    fn balance(&self, subject: &str) -> Result<f64, ProviderError> {
        Ok(self.balances.get(subject).map(|b| *b).unwrap_or(0.0))
    }

    fn deposit(&self, subject: &str, amount: f64) -> Result<bool, ProviderError> {
        if !amount.is_finite() || amount < 0.0 {
            return Ok(false);
        }
        *self.balances.entry(subject.to_string()).or_insert(0.0) += amount;
        Ok(true)
    }

    fn withdraw(&self, subject: &str, amount: f64) -> Result<bool, ProviderError> {
        if !amount.is_finite() || amount < 0.0 {
            return Ok(false);
        }
        let mut balance = self.balances.entry(subject.to_string()).or_insert(0.0);
        if *balance < amount {
            return Ok(false);
        }
        *balance -= amount;
        Ok(true)
    }
}
