//! Periodic task supervision.
//!
//! # Responsibilities
//! - Run named maintenance tasks on a fixed interval
//! - Contain task failures and panics so one bad run never stops the schedule
//! - Stop every task on shutdown

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use dashmap::DashMap;
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::lifecycle::shutdown::Shutdown;
use crate::observability::metrics;

/// Error type returned by supervised tasks.
pub type TaskError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Default)]
struct TaskStats {
    runs: AtomicU64,
    failures: AtomicU64,
}

/// Owns the periodic background tasks of a vault.
pub struct Supervisor {
    shutdown: Shutdown,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    stats: DashMap<String, Arc<TaskStats>>,
}

impl Supervisor {
    pub fn new() -> Self {
        Self {
            shutdown: Shutdown::new(),
            tasks: Mutex::new(Vec::new()),
            stats: DashMap::new(),
        }
    }

    /// Run `task` every `interval`, first run one interval from now.
    ///
    /// Each run executes in its own Tokio task; an `Err` or a panic is logged
    /// and counted, and the schedule continues.
    pub fn spawn_periodic<F, Fut>(&self, name: &str, interval: Duration, task: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
    {
        let name = name.to_string();
        let stats = self
            .stats
            .entry(name.clone())
            .or_insert_with(|| Arc::new(TaskStats::default()))
            .clone();
        let mut shutdown = self.shutdown.subscribe();

        tracing::info!(task = %name, interval_secs = interval.as_secs_f64(), "Periodic task scheduled");

        let handle = tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let mut run = tokio::spawn(task());
                        let _guard = AbortOnDrop(run.abort_handle());
                        let outcome = tokio::select! {
                            outcome = &mut run => outcome,
                            _ = shutdown.recv() => {
                                tracing::debug!(task = %name, "Aborting in-flight run");
                                break;
                            }
                        };
                        let ok = match outcome {
                            Ok(Ok(())) => true,
                            Ok(Err(e)) => {
                                tracing::error!(task = %name, error = %e, "Periodic task failed");
                                false
                            }
                            Err(e) => {
                                tracing::error!(task = %name, error = %e, "Periodic task panicked");
                                false
                            }
                        };
                        stats.runs.fetch_add(1, Ordering::Relaxed);
                        if !ok {
                            stats.failures.fetch_add(1, Ordering::Relaxed);
                        }
                        metrics::record_maintenance_run(&name, ok);
                    }
                    _ = shutdown.recv() => {
                        tracing::debug!(task = %name, "Periodic task stopping");
                        break;
                    }
                }
            }
        });

        self.tasks
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(handle);
    }

    /// Completed runs of `name`, successful or not.
    pub fn run_count(&self, name: &str) -> u64 {
        self.stats
            .get(name)
            .map(|s| s.runs.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    pub fn failure_count(&self, name: &str) -> u64 {
        self.stats
            .get(name)
            .map(|s| s.failures.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Number of scheduled tasks that have not been stopped.
    pub fn task_count(&self) -> usize {
        self.tasks
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .iter()
            .filter(|h| !h.is_finished())
            .count()
    }

    /// Signal every task to stop and abort any run still in flight.
    pub fn stop(&self) {
        self.shutdown.trigger();
        let tasks: Vec<_> = self
            .tasks
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .drain(..)
            .collect();
        for task in tasks {
            task.abort();
        }
    }
}

/// Aborts a run when the ticker that owns it goes away.
struct AbortOnDrop(AbortHandle);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

impl Default for Supervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        self.stop();
    }
}
