//! Balance snapshots and their persistence.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;

const BACKUP_PREFIX: &str = "backup_";
const BACKUP_SUFFIX: &str = ".json";

/// Errors raised while persisting a snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot encoding error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Balances of every known subject at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    /// Milliseconds since the Unix epoch.
    pub taken_at: u64,
    pub balances: BTreeMap<String, f64>,
}

impl BalanceSnapshot {
    pub fn new(balances: BTreeMap<String, f64>) -> Self {
        Self {
            taken_at: unix_millis(),
            balances,
        }
    }
}

/// Destination for periodic snapshots. Called from a blocking worker.
pub trait SnapshotSink: Send + Sync {
    fn store(&self, snapshot: &BalanceSnapshot) -> Result<(), SnapshotError>;
}

/// Discards every snapshot.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl SnapshotSink for NullSink {
    fn store(&self, _snapshot: &BalanceSnapshot) -> Result<(), SnapshotError> {
        Ok(())
    }
}

/// Writes `backup_<unix-millis>.json` files and keeps only the newest ones.
#[derive(Debug)]
pub struct JsonFileSink {
    dir: PathBuf,
    max_backups: usize,
    last_stamp: AtomicU64,
}

impl JsonFileSink {
    pub fn new(dir: impl Into<PathBuf>, max_backups: usize) -> Self {
        Self {
            dir: dir.into(),
            max_backups,
            last_stamp: AtomicU64::new(0),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Backup files currently on disk, oldest first.
    pub fn backups(&self) -> Result<Vec<PathBuf>, SnapshotError> {
        let mut found: Vec<(u64, PathBuf)> = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if let Some(stamp) = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(parse_stamp)
            {
                found.push((stamp, path));
            }
        }
        found.sort();
        Ok(found.into_iter().map(|(_, p)| p).collect())
    }

    /// Stamps never repeat, even for two snapshots in the same millisecond.
    fn next_stamp(&self, taken_at: u64) -> u64 {
        let mut current = self.last_stamp.load(Ordering::Relaxed);
        loop {
            let next = taken_at.max(current + 1);
            match self
                .last_stamp
                .compare_exchange(current, next, Ordering::Relaxed, Ordering::Relaxed)
            {
                Ok(_) => return next,
                Err(actual) => current = actual,
            }
        }
    }

    fn prune(&self) -> Result<usize, SnapshotError> {
        let backups = self.backups()?;
        let excess = backups.len().saturating_sub(self.max_backups);
        for path in &backups[..excess] {
            fs::remove_file(path)?;
            tracing::debug!(path = %path.display(), "Removed old backup");
        }
        Ok(excess)
    }
}

impl SnapshotSink for JsonFileSink {
    fn store(&self, snapshot: &BalanceSnapshot) -> Result<(), SnapshotError> {
        fs::create_dir_all(&self.dir)?;
        let stamp = self.next_stamp(snapshot.taken_at);
        let path = self
            .dir
            .join(format!("{}{}{}", BACKUP_PREFIX, stamp, BACKUP_SUFFIX));

        if let Err(e) = write_snapshot(&path, snapshot) {
            if let Err(cleanup) = fs::remove_file(&path) {
                tracing::debug!(path = %path.display(), error = %cleanup, "Could not remove partial backup");
            }
            return Err(e);
        }

        let removed = self.prune()?;
        tracing::info!(
            path = %path.display(),
            subjects = snapshot.balances.len(),
            removed,
            "Balance snapshot written"
        );
        Ok(())
    }
}

fn write_snapshot(path: &Path, snapshot: &BalanceSnapshot) -> Result<(), SnapshotError> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, snapshot)?;
    writer.flush()?;
    writer.into_inner().map_err(|e| e.into_error())?.sync_all()?;
    Ok(())
}

fn parse_stamp(file_name: &str) -> Option<u64> {
    file_name
        .strip_prefix(BACKUP_PREFIX)?
        .strip_suffix(BACKUP_SUFFIX)?
        .parse()
        .ok()
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
