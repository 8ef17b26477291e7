//! TTL-bounded snapshot of the observer's wallet view.
//!
//! One JSON document `{wallets, lastUpdated}` on disk; staleness is decided
//! at read time and a stale snapshot is removed.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::scanner::WalletRecord;

pub const SNAPSHOT_FILE: &str = "wallet-checker-progress.json";

pub const SNAPSHOT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Cache I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Cache encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheSnapshot {
    pub wallets: Vec<WalletRecord>,
    /// Epoch milliseconds.
    pub last_updated: u64,
}

pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
    ttl: Duration,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ttl: SNAPSHOT_TTL,
        }
    }

    /// Store under the default file name inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(SNAPSHOT_FILE))
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write `wallets` stamped with the current time.
    pub fn persist(&self, wallets: &[WalletRecord]) -> Result<CacheSnapshot, CacheError> {
        let snapshot = CacheSnapshot {
            wallets: wallets.to_vec(),
            last_updated: now_millis(),
        };
        self.write(&snapshot)?;
        Ok(snapshot)
    }

    pub fn write(&self, snapshot: &CacheSnapshot) -> Result<(), CacheError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_vec(snapshot)?)?;
        Ok(())
    }

    /// Fresh snapshot, if any. Stale or unreadable snapshots are evicted.
    pub fn load(&self) -> Result<Option<CacheSnapshot>, CacheError> {
        self.load_at(now_millis())
    }

    pub fn load_at(&self, now_ms: u64) -> Result<Option<CacheSnapshot>, CacheError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let snapshot: CacheSnapshot = match serde_json::from_slice(&bytes) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Discarding unreadable snapshot");
                self.clear()?;
                return Ok(None);
            }
        };

        let age = now_ms.saturating_sub(snapshot.last_updated);
        if u128::from(age) > self.ttl.as_millis() {
            tracing::info!(path = %self.path.display(), age_ms = age, "Snapshot expired");
            self.clear()?;
            return Ok(None);
        }
        Ok(Some(snapshot))
    }

    /// Remove the snapshot. Missing is fine.
    pub fn clear(&self) -> Result<(), CacheError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
