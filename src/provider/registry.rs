//! Provider registry.
//!
//! # Responsibilities
//! - Hold the discovered providers and their resolved priorities
//! - Apply configured priority overrides over discovery hints
//! - Select the active provider deterministically
//!
//! # Design Decisions
//! - Copy-on-write: every change builds a new `ProviderSet` and swaps it in,
//!   so readers always see one complete discovery pass
//! - Highest priority wins; ties go to the lexically smallest name
//! - An empty discovery is a warning, not an error: the vault keeps running
//!   with no active provider

use std::collections::BTreeMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use dashmap::DashMap;

use crate::error::VaultError;
use crate::events::{EventBus, VaultEvent};
use crate::observability::metrics;
use crate::provider::{normalize_name, Candidate, ProviderEntry};

/// Priority of a provider with neither an override nor a hint.
pub const DEFAULT_PRIORITY: i32 = 1;

/// One immutable view of the registered providers.
#[derive(Debug, Clone, Default)]
pub struct ProviderSet {
    providers: BTreeMap<String, Arc<ProviderEntry>>,
    active: Option<Arc<ProviderEntry>>,
    generation: u64,
}

impl ProviderSet {
    pub fn get(&self, name: &str) -> Option<&Arc<ProviderEntry>> {
        self.providers.get(&normalize_name(name))
    }

    /// Providers in name order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<ProviderEntry>> {
        self.providers.values()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn active(&self) -> Option<&Arc<ProviderEntry>> {
        self.active.as_ref()
    }

    pub fn active_name(&self) -> Option<&str> {
        self.active.as_ref().map(|e| e.name.as_str())
    }

    /// Discovery pass that produced this set.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Strictly highest priority, lexically smallest name on ties.
    fn best(&self) -> Option<Arc<ProviderEntry>> {
        // BTreeMap iterates in name order, so keeping the incumbent on ties
        // yields the smallest name.
        self.providers
            .values()
            .fold(None::<&Arc<ProviderEntry>>, |best, entry| match best {
                Some(b) if b.priority >= entry.priority => Some(b),
                _ => Some(entry),
            })
            .cloned()
    }
}

/// Registry of known providers with priority-based selection.
pub struct ProviderRegistry {
    set: ArcSwap<ProviderSet>,
    overrides: DashMap<String, i32>,
    events: EventBus,
}

impl ProviderRegistry {
    pub fn new(events: EventBus) -> Self {
        Self {
            set: ArcSwap::from_pointee(ProviderSet::default()),
            overrides: DashMap::new(),
            events,
        }
    }

    /// Replace the whole provider set with `candidates`.
    ///
    /// The previously active provider stays active if it is still present;
    /// call [`select_active`](Self::select_active) to re-evaluate. Returns the
    /// number of registered providers.
    pub fn discover(&self, candidates: Vec<Candidate>) -> usize {
        let mut providers = BTreeMap::new();

        for candidate in candidates {
            let name = normalize_name(&candidate.name);
            if name.is_empty() {
                tracing::warn!("Ignoring provider candidate with empty name");
                continue;
            }
            let priority = self.resolve_priority(&name, candidate.priority_hint);
            let entry = ProviderEntry::new(name.clone(), priority, candidate.handle)
                .with_hint(candidate.priority_hint);
            if providers.insert(name.clone(), Arc::new(entry)).is_some() {
                tracing::warn!(provider = %name, "Duplicate provider in discovery, keeping the later one");
            }
            tracing::info!(provider = %name, priority, "Discovered economy provider");
        }

        let count = providers.len();
        self.set.rcu(|current| {
            let active = current
                .active_name()
                .and_then(|name| providers.get(name).cloned());
            ProviderSet {
                providers: providers.clone(),
                active,
                generation: current.generation + 1,
            }
        });
        metrics::record_registered_providers(count);

        if count == 0 {
            tracing::warn!("No economy providers found");
            self.events.publish(VaultEvent::ProviderConnectionFailed {
                cause: VaultError::DiscoveryEmpty.to_string(),
            });
        }
        count
    }

    /// Select the highest-priority provider as active and return its name.
    pub fn select_active(&self) -> Option<String> {
        let previous = self.set.rcu(|current| {
            let mut next = ProviderSet::clone(current);
            next.active = next.best();
            next
        });
        let current = self.set.load();
        let selected = current.active_name().map(str::to_string);

        if previous.active_name() != selected.as_deref() {
            match &selected {
                Some(name) => tracing::info!(provider = %name, "Active economy provider selected"),
                None => tracing::warn!("No active economy provider"),
            }
        }
        selected
    }

    /// Re-apply priority overrides to the current providers and reselect.
    pub fn reprioritize(&self) -> Option<String> {
        self.set.rcu(|current| {
            let providers: BTreeMap<_, _> = current
                .providers
                .iter()
                .map(|(name, entry)| {
                    let priority = self.resolve_priority(name, entry.priority_hint);
                    let entry = if priority == entry.priority {
                        entry.clone()
                    } else {
                        tracing::info!(provider = %name, from = entry.priority, to = priority, "Provider priority changed");
                        Arc::new(entry.with_priority(priority))
                    };
                    (name.clone(), entry)
                })
                .collect();
            let active = current
                .active_name()
                .and_then(|name| providers.get(name).cloned());
            ProviderSet {
                providers,
                active,
                generation: current.generation,
            }
        });
        self.select_active()
    }

    /// Register a priority override, used on the next discovery or reprioritize.
    pub fn set_priority(&self, name: &str, priority: i32) {
        self.overrides.insert(normalize_name(name), priority);
    }

    pub fn remove_priority(&self, name: &str) -> Option<i32> {
        self.overrides.remove(&normalize_name(name)).map(|(_, p)| p)
    }

    pub fn priority_override(&self, name: &str) -> Option<i32> {
        self.overrides.get(&normalize_name(name)).map(|p| *p)
    }

    /// Snapshot of all overrides.
    pub fn priority_overrides(&self) -> BTreeMap<String, i32> {
        self.overrides
            .iter()
            .map(|r| (r.key().clone(), *r.value()))
            .collect()
    }

    /// Replace all overrides at once (configuration reload).
    pub fn replace_overrides(&self, overrides: &BTreeMap<String, i32>) {
        self.overrides.clear();
        for (name, priority) in overrides {
            self.set_priority(name, *priority);
        }
    }

    pub fn active(&self) -> Option<Arc<ProviderEntry>> {
        self.set.load().active.clone()
    }

    pub fn active_name(&self) -> Option<String> {
        self.set.load().active_name().map(str::to_string)
    }

    /// Registered providers in name order.
    pub fn providers(&self) -> Vec<Arc<ProviderEntry>> {
        self.set.load().iter().cloned().collect()
    }

    /// Consistent snapshot of the current provider set.
    pub fn snapshot(&self) -> Arc<ProviderSet> {
        self.set.load_full()
    }

    /// Drop every provider. Overrides are kept.
    pub fn clear(&self) {
        self.set.rcu(|current| ProviderSet {
            generation: current.generation,
            ..ProviderSet::default()
        });
        metrics::record_registered_providers(0);
    }

    fn resolve_priority(&self, name: &str, hint: Option<i32>) -> i32 {
        self.overrides
            .get(name)
            .map(|p| *p)
            .or(hint)
            .unwrap_or(DEFAULT_PRIORITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::InMemoryProvider;

    fn candidate(name: &str, priority: Option<i32>) -> Candidate {
        let c = Candidate::new(name, Arc::new(InMemoryProvider::new()));
        match priority {
            Some(p) => c.with_priority(p),
            None => c,
        }
    }

    #[test]
    fn test_highest_priority_wins() {
        let registry = ProviderRegistry::new(EventBus::new());
        registry.discover(vec![
            candidate("alpha", Some(5)),
            candidate("beta", Some(1)),
            candidate("gamma", Some(5)),
        ]);

        assert_eq!(registry.select_active().as_deref(), Some("alpha"));
    }

    #[test]
    fn test_strict_maximum_over_names() {
        let registry = ProviderRegistry::new(EventBus::new());
        registry.discover(vec![candidate("aardvark", Some(2)), candidate("zebra", Some(3))]);
        assert_eq!(registry.select_active().as_deref(), Some("zebra"));
    }

    #[test]
    fn test_override_beats_hint_and_default_is_one() {
        let registry = ProviderRegistry::new(EventBus::new());
        registry.set_priority("Beta", 10);
        registry.discover(vec![candidate("alpha", Some(5)), candidate("BETA", Some(1)), candidate("delta", None)]);

        let set = registry.snapshot();
        assert_eq!(set.get("beta").unwrap().priority, 10);
        assert_eq!(set.get("delta").unwrap().priority, DEFAULT_PRIORITY);
        assert_eq!(registry.select_active().as_deref(), Some("beta"));
    }

    #[test]
    fn test_empty_discovery_publishes_failure() {
        let bus = EventBus::new();
        let mut sub = bus.subscribe();
        let registry = ProviderRegistry::new(bus);

        assert_eq!(registry.discover(Vec::new()), 0);
        assert_eq!(registry.select_active(), None);
        assert!(matches!(
            sub.try_recv(),
            Some(VaultEvent::ProviderConnectionFailed { .. })
        ));
    }

    #[test]
    fn test_rediscovery_keeps_active_until_reselected() {
        let registry = ProviderRegistry::new(EventBus::new());
        registry.discover(vec![candidate("alpha", Some(1))]);
        registry.select_active();

        registry.discover(vec![candidate("alpha", Some(1)), candidate("omega", Some(9))]);
        assert_eq!(registry.active_name().as_deref(), Some("alpha"));
        assert_eq!(registry.select_active().as_deref(), Some("omega"));

        registry.discover(vec![candidate("beta", Some(1))]);
        assert_eq!(registry.active_name(), None);
    }

    #[test]
    fn test_reprioritize_reselects() {
        let registry = ProviderRegistry::new(EventBus::new());
        registry.discover(vec![candidate("alpha", Some(5)), candidate("beta", Some(1))]);
        registry.select_active();

        registry.set_priority("beta", 50);
        assert_eq!(registry.reprioritize().as_deref(), Some("beta"));

        registry.remove_priority("beta");
        assert_eq!(registry.reprioritize().as_deref(), Some("alpha"));
        assert_eq!(registry.snapshot().get("beta").unwrap().priority, 1);
    }

    #[test]
    fn test_clear_keeps_overrides() {
        let registry = ProviderRegistry::new(EventBus::new());
        registry.set_priority("alpha", 3);
        registry.discover(vec![candidate("alpha", None)]);
        registry.select_active();

        registry.clear();
        assert!(registry.snapshot().is_empty());
        assert!(registry.active().is_none());
        assert_eq!(registry.priority_override("ALPHA"), Some(3));
    }

    #[test]
    fn test_readers_never_see_mixed_passes() {
        let registry = Arc::new(ProviderRegistry::new(EventBus::new()));
        let writer = {
            let registry = registry.clone();
            std::thread::spawn(move || {
                for pass in 0..200 {
                    let candidates = ["a", "b", "c", "d"]
                        .iter()
                        .map(|n| candidate(n, Some(pass)))
                        .collect();
                    registry.discover(candidates);
                }
            })
        };

        for _ in 0..2_000 {
            let set = registry.snapshot();
            let priorities: Vec<i32> = set.iter().map(|e| e.priority).collect();
            assert!(priorities.windows(2).all(|w| w[0] == w[1]));
            assert!(set.is_empty() || set.len() == 4);
        }
        writer.join().unwrap();
    }

    #[test]
    fn test_concurrent_discovery_and_selection_lose_no_update() {
        let registry = Arc::new(ProviderRegistry::new(EventBus::new()));
        let mut workers = Vec::new();
        for _ in 0..4 {
            let registry = registry.clone();
            workers.push(std::thread::spawn(move || {
                for _ in 0..100 {
                    registry.discover(vec![candidate("a", Some(1)), candidate("b", Some(2))]);
                }
            }));
        }
        for _ in 0..2 {
            let registry = registry.clone();
            workers.push(std::thread::spawn(move || {
                for _ in 0..200 {
                    registry.select_active();
                }
            }));
        }
        for worker in workers {
            worker.join().unwrap();
        }

        let set = registry.snapshot();
        assert_eq!(set.generation(), 400);
        if let Some(name) = set.active_name() {
            let registered = set.iter().find(|e| e.name == name).unwrap();
            assert!(Arc::ptr_eq(set.active().unwrap(), registered));
        }
    }
}
