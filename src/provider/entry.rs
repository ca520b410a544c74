//! Provider record.
//!
//! # Responsibilities
//! - Represent a single discovered provider
//! - Track live usage (attempts currently holding a lease)

use std::fmt;
use std::ops::Deref;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::provider::EconomyProvider;

/// A single registered provider.
pub struct ProviderEntry {
    /// Normalized provider name.
    pub name: String,
    /// Resolved priority (higher wins).
    pub priority: i32,
    /// Priority offered by the host at discovery, if any.
    pub priority_hint: Option<i32>,
    /// The backend capability.
    pub handle: Arc<dyn EconomyProvider>,
    /// Number of attempts currently using this provider. Shared between
    /// re-prioritized copies of the same discovered provider.
    live_usage: Arc<AtomicUsize>,
}

impl ProviderEntry {
    pub fn new(name: String, priority: i32, handle: Arc<dyn EconomyProvider>) -> Self {
        Self {
            name,
            priority,
            priority_hint: None,
            handle,
            live_usage: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_hint(mut self, hint: Option<i32>) -> Self {
        self.priority_hint = hint;
        self
    }

    /// Copy of this entry with a different priority, sharing the usage counter.
    pub fn with_priority(&self, priority: i32) -> Self {
        Self {
            name: self.name.clone(),
            priority,
            priority_hint: self.priority_hint,
            handle: self.handle.clone(),
            live_usage: self.live_usage.clone(),
        }
    }

    /// Current number of live leases.
    pub fn live_usage(&self) -> usize {
        self.live_usage.load(Ordering::Relaxed)
    }

    /// Take a lease that counts as live usage until dropped.
    pub fn lease(self: &Arc<Self>) -> ProviderLease {
        self.live_usage.fetch_add(1, Ordering::Relaxed);
        ProviderLease {
            entry: self.clone(),
        }
    }
}

impl fmt::Debug for ProviderEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderEntry")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("priority_hint", &self.priority_hint)
            .field("live_usage", &self.live_usage())
            .finish()
    }
}

/// A RAII guard that manages the live-usage count.
#[derive(Debug)]
pub struct ProviderLease {
    pub entry: Arc<ProviderEntry>,
}

impl Deref for ProviderLease {
    type Target = ProviderEntry;
    fn deref(&self) -> &Self::Target {
        &self.entry
    }
}

impl Drop for ProviderLease {
    fn drop(&mut self) {
        self.entry.live_usage.fetch_sub(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::InMemoryProvider;

    #[test]
    fn test_lease_tracks_usage() {
        let entry = Arc::new(ProviderEntry::new(
            "essentials".into(),
            3,
            Arc::new(InMemoryProvider::new()),
        ));
        assert_eq!(entry.live_usage(), 0);

        let l1 = entry.lease();
        let l2 = entry.lease();
        assert_eq!(entry.live_usage(), 2);
        assert_eq!(l1.name, "essentials");

        drop(l1);
        assert_eq!(entry.live_usage(), 1);
        let bumped = entry.with_priority(9);
        assert_eq!(bumped.live_usage(), 1);
        drop(l2);
        assert_eq!(bumped.live_usage(), 0);
        assert_eq!(entry.live_usage(), 0);
    }
}
