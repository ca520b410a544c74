//! Periodic maintenance.
//!
//! # Data Flow
//! ```text
//! Supervisor tick
//!     → SnapshotJob::run
//!     → SubjectDirectory (who to snapshot)
//!     → active provider balance per subject (0 on error)
//!     → SnapshotSink::store on a blocking worker (snapshot.rs)
//! ```

pub mod snapshot;

use std::collections::BTreeMap;
use std::sync::Arc;

pub use snapshot::{BalanceSnapshot, JsonFileSink, NullSink, SnapshotError, SnapshotSink};

use crate::provider::{ProviderRegistry, SubjectDirectory};
use crate::vault::economy::read_balance;

/// Name under which the snapshot task is supervised.
pub const SNAPSHOT_TASK: &str = "balance_snapshot";

/// Collects every subject's balance and hands it to a sink.
#[derive(Clone)]
pub struct SnapshotJob {
    registry: Arc<ProviderRegistry>,
    subjects: Arc<dyn SubjectDirectory>,
    sink: Arc<dyn SnapshotSink>,
}

impl SnapshotJob {
    pub fn new(
        registry: Arc<ProviderRegistry>,
        subjects: Arc<dyn SubjectDirectory>,
        sink: Arc<dyn SnapshotSink>,
    ) -> Self {
        Self {
            registry,
            subjects,
            sink,
        }
    }

    /// Take one snapshot. Returns the number of subjects captured.
    pub async fn run(&self) -> Result<usize, SnapshotError> {
        let mut balances = BTreeMap::new();
        for subject in self.subjects.subjects() {
            let balance = read_balance(&self.registry, &subject).await;
            balances.insert(subject, balance);
        }
        let snapshot = BalanceSnapshot::new(balances);
        let count = snapshot.balances.len();

        let sink = self.sink.clone();
        tokio::task::spawn_blocking(move || sink.store(&snapshot))
            .await
            .map_err(|e| SnapshotError::Io(std::io::Error::other(e.to_string())))??;

        tracing::debug!(subjects = count, "Snapshot stored");
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventBus;
    use crate::provider::{Candidate, InMemoryProvider, StaticSubjects};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        stored: Mutex<Vec<BalanceSnapshot>>,
    }

    impl SnapshotSink for RecordingSink {
        fn store(&self, snapshot: &BalanceSnapshot) -> Result<(), SnapshotError> {
            self.stored.lock().unwrap().push(snapshot.clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_snapshot_reads_every_subject() {
        let registry = Arc::new(ProviderRegistry::new(EventBus::new()));
        let provider = InMemoryProvider::with_balances([("alice", 10.0), ("bob", 2.5)]);
        registry.discover(vec![Candidate::new("memory", Arc::new(provider))]);
        registry.select_active();

        let sink = Arc::new(RecordingSink::default());
        let subjects = Arc::new(StaticSubjects::new(["alice", "bob", "carol"]));
        let job = SnapshotJob::new(registry, subjects, sink.clone());

        assert_eq!(job.run().await.unwrap(), 3);
        let stored = sink.stored.lock().unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].balances["alice"], 10.0);
        assert_eq!(stored[0].balances["carol"], 0.0);
    }

    #[tokio::test]
    async fn test_no_provider_snapshots_zeroes() {
        let registry = Arc::new(ProviderRegistry::new(EventBus::new()));
        let sink = Arc::new(RecordingSink::default());
        let job = SnapshotJob::new(registry, Arc::new(StaticSubjects::new(["alice"])), sink.clone());

        job.run().await.unwrap();
        assert_eq!(sink.stored.lock().unwrap()[0].balances["alice"], 0.0);
    }
}
