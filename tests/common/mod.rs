//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use vault_bridge::provider::{Candidate, InMemoryProvider, StaticDirectory};
use vault_bridge::{EconomyProvider, ProviderError, VaultBuilder};

/// A provider whose first `failures` calls fail with a backend error.
#[derive(Debug)]
pub struct FlakyProvider {
    inner: InMemoryProvider,
    failures: u32,
    calls: AtomicU32,
}

impl FlakyProvider {
    pub fn new(failures: u32) -> Self {
        Self {
            inner: InMemoryProvider::new(),
            failures,
            calls: AtomicU32::new(0),
        }
    }

    /// A provider that never succeeds.
    pub fn broken() -> Self {
        Self::new(u32::MAX)
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    fn gate(&self) -> Result<(), ProviderError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if n < self.failures {
            Err(ProviderError::Backend(format!("injected failure #{}", n + 1)))
        } else {
            Ok(())
        }
    }
}

impl EconomyProvider for FlakyProvider {
    fn balance(&self, subject: &str) -> Result<f64, ProviderError> {
        self.gate()?;
        self.inner.balance(subject)
    }

    fn deposit(&self, subject: &str, amount: f64) -> Result<bool, ProviderError> {
        self.gate()?;
        self.inner.deposit(subject, amount)
    }

    fn withdraw(&self, subject: &str, amount: f64) -> Result<bool, ProviderError> {
        self.gate()?;
        self.inner.withdraw(subject, amount)
    }
}

/// Builder with no listener, no maintenance and a short retry delay.
pub fn quiet_builder() -> VaultBuilder {
    VaultBuilder::new()
        .http_enabled(false)
        .maintenance_enabled(false)
        .retry_delay(Duration::from_millis(20))
}

/// Directory holding a single provider.
pub fn single(name: &str, provider: Arc<dyn EconomyProvider>) -> Arc<StaticDirectory> {
    Arc::new(StaticDirectory::new(vec![Candidate::new(name, provider)]))
}
