//! Host-side directories feeding the vault.
//!
//! The host decides how providers and subjects are found; the vault only
//! consumes these lists.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::{Arc, RwLock};

use crate::provider::EconomyProvider;

/// A provider offered by the host for discovery.
#[derive(Clone)]
pub struct Candidate {
    pub name: String,
    /// Used when no override is configured for this name.
    pub priority_hint: Option<i32>,
    pub handle: Arc<dyn EconomyProvider>,
}

impl Candidate {
    pub fn new(name: impl Into<String>, handle: Arc<dyn EconomyProvider>) -> Self {
        Self {
            name: name.into(),
            priority_hint: None,
            handle,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority_hint = Some(priority);
        self
    }
}

impl fmt::Debug for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Candidate")
            .field("name", &self.name)
            .field("priority_hint", &self.priority_hint)
            .finish()
    }
}

/// Source of provider candidates.
pub trait ServiceDirectory: Send + Sync {
    fn candidates(&self) -> Vec<Candidate>;
}

/// Source of the subjects (accounts) currently known to the host.
pub trait SubjectDirectory: Send + Sync {
    fn subjects(&self) -> Vec<String>;

    fn contains(&self, subject: &str) -> bool {
        self.subjects().iter().any(|s| s == subject)
    }
}

/// A directory with a fixed, replaceable candidate list.
#[derive(Default)]
pub struct StaticDirectory {
    candidates: RwLock<Vec<Candidate>>,
}

impl StaticDirectory {
    pub fn new(candidates: Vec<Candidate>) -> Self {
        Self {
            candidates: RwLock::new(candidates),
        }
    }

    /// Replace the advertised candidates (takes effect on next discovery).
    pub fn replace(&self, candidates: Vec<Candidate>) {
        match self.candidates.write() {
            Ok(mut guard) => *guard = candidates,
            Err(poisoned) => *poisoned.into_inner() = candidates,
        }
    }
}

impl ServiceDirectory for StaticDirectory {
    fn candidates(&self) -> Vec<Candidate> {
        match self.candidates.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

/// A subject directory backed by an in-memory set.
#[derive(Debug, Default)]
pub struct StaticSubjects {
    subjects: RwLock<BTreeSet<String>>,
}

impl StaticSubjects {
    pub fn new<I, S>(subjects: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            subjects: RwLock::new(subjects.into_iter().map(Into::into).collect()),
        }
    }

    pub fn insert(&self, subject: impl Into<String>) {
        if let Ok(mut guard) = self.subjects.write() {
            guard.insert(subject.into());
        }
    }

    pub fn remove(&self, subject: &str) {
        if let Ok(mut guard) = self.subjects.write() {
            guard.remove(subject);
        }
    }
}

impl SubjectDirectory for StaticSubjects {
    fn subjects(&self) -> Vec<String> {
        self.subjects
            .read()
            .map(|guard| guard.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn contains(&self, subject: &str) -> bool {
        self.subjects
            .read()
            .map(|guard| guard.contains(subject))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::InMemoryProvider;

    #[test]
    fn test_static_directory_replace() {
        let dir = StaticDirectory::new(vec![Candidate::new("a", Arc::new(InMemoryProvider::new()))]);
        assert_eq!(dir.candidates().len(), 1);

        dir.replace(Vec::new());
        assert!(dir.candidates().is_empty());
    }

    #[test]
    fn test_static_subjects() {
        let subjects = StaticSubjects::new(["steve", "alex"]);
        assert!(subjects.contains("alex"));
        assert!(!subjects.contains("herobrine"));

        subjects.insert("herobrine");
        subjects.remove("steve");
        assert_eq!(subjects.subjects(), vec!["alex".to_string(), "herobrine".to_string()]);
    }
}
