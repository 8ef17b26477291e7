//! Observer-side wallet view.

use serde::Serialize;
use std::cmp::Ordering;

use crate::client::cache::{CacheError, SnapshotStore};
use crate::progress::PushMessage;
use crate::scanner::{RecordSet, WalletRecord};

/// Counters shown while a scan is running.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub completed: usize,
    pub errors: usize,
}

/// Address-keyed records, optionally backed by a snapshot store.
#[derive(Debug, Default)]
pub struct ClientState {
    records: RecordSet,
    store: Option<SnapshotStore>,
}

impl ClientState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_store(store: SnapshotStore) -> Self {
        Self {
            records: RecordSet::new(),
            store: Some(store),
        }
    }

    /// Start from the stored snapshot when it is still fresh.
    pub fn restore(store: SnapshotStore) -> Result<Self, CacheError> {
        let mut state = Self::with_store(store);
        if let Some(snapshot) = state.store.as_ref().map(SnapshotStore::load).transpose()?.flatten() {
            tracing::info!(wallets = snapshot.wallets.len(), "Progress restored");
            state.records.merge(snapshot.wallets);
        }
        Ok(state)
    }

    /// Apply records last-write-wins; unmentioned addresses are untouched.
    pub fn merge<I: IntoIterator<Item = WalletRecord>>(&mut self, chunk: I) {
        self.records.merge(chunk);
    }

    /// Fold one push message into the view. Returns whether anything changed.
    pub fn apply(&mut self, message: &PushMessage) -> bool {
        match message {
            PushMessage::WalletUpdate {
                wallets: Some(wallets),
                ..
            } if !wallets.is_empty() => {
                self.merge(wallets.iter().cloned());
                true
            }
            PushMessage::Upload {
                addresses: Some(addresses),
                ..
            } if !addresses.is_empty() => {
                addresses.iter().for_each(|a| self.records.insert_pending(a));
                true
            }
            PushMessage::WalletUpdate { .. } | PushMessage::Upload { .. } | PushMessage::Pong => false,
        }
    }

    /// Write the current view with a fresh timestamp. No-op without a store.
    pub fn persist(&self) -> Result<(), CacheError> {
        if let Some(store) = &self.store {
            store.persist(self.records.records())?;
        }
        Ok(())
    }

    /// Drop every record and the stored snapshot.
    pub fn clear(&mut self) -> Result<(), CacheError> {
        self.records = RecordSet::new();
        if let Some(store) = &self.store {
            store.clear()?;
        }
        Ok(())
    }

    pub fn records(&self) -> &[WalletRecord] {
        self.records.records()
    }

    pub fn get(&self, address: &str) -> Option<&WalletRecord> {
        self.records.get(address)
    }

    pub fn summary(&self) -> Summary {
        let records = self.records.records();
        Summary {
            total: records.len(),
            completed: records.iter().filter(|r| r.checked()).count(),
            errors: records.iter().filter(|r| r.error().is_some()).count(),
        }
    }

    /// Records by balance, highest first; records without a balance last.
    pub fn ranked(&self) -> Vec<&WalletRecord> {
        let mut ranked: Vec<&WalletRecord> = self.records.records().iter().collect();
        ranked.sort_by(|a, b| {
            let a = a.balance().and_then(|v| v.parse::<f64>().ok());
            let b = b.balance().and_then(|v| v.parse::<f64>().ok());
            match (a, b) {
                (Some(a), Some(b)) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            }
        });
        ranked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::cache::{now_millis, CacheSnapshot};

    fn update(wallets: Vec<WalletRecord>) -> PushMessage {
        PushMessage::WalletUpdate {
            run_id: None,
            progress: 50,
            total: None,
            completed: None,
            wallets: Some(wallets),
            error: None,
        }
    }

    #[test]
    fn test_merge_is_last_write_wins() {
        let mut state = ClientState::new();
        state.merge([WalletRecord::pending("a"), WalletRecord::pending("b")]);
        state.merge([WalletRecord::resolved("a", "1.0000")]);

        assert_eq!(state.get("a").unwrap().balance(), Some("1.0000"));
        assert!(!state.get("b").unwrap().checked());
        assert_eq!(state.records().len(), 2);
    }

    #[test]
    fn test_applying_deltas_matches_accumulated() {
        let batches = vec![
            vec![WalletRecord::resolved("a", "1.0000"), WalletRecord::failed("b", "Failed to fetch balance")],
            vec![WalletRecord::resolved("c", "0.5000"), WalletRecord::resolved("b", "2.0000")],
        ];

        let mut by_delta = ClientState::new();
        let mut accumulated = RecordSet::new();
        for batch in &batches {
            assert!(by_delta.apply(&update(batch.clone())));
            accumulated.merge(batch.iter().cloned());
        }
        let mut by_snapshot = ClientState::new();
        by_snapshot.merge(accumulated.into_records());

        assert_eq!(by_delta.records(), by_snapshot.records());
    }

    #[test]
    fn test_upload_addresses_become_pending() {
        let mut state = ClientState::new();
        state.merge([WalletRecord::resolved("a", "1.0000")]);
        let changed = state.apply(&PushMessage::Upload {
            progress: 100,
            total: Some(2),
            completed: Some(2),
            addresses: Some(vec!["a".into(), "b".into()]),
            error: None,
        });

        assert!(changed);
        assert_eq!(state.get("a").unwrap().balance(), Some("1.0000"));
        assert!(!state.get("b").unwrap().checked());
        assert!(!state.apply(&PushMessage::Pong));
    }

    #[test]
    fn test_summary_and_ranking() {
        let mut state = ClientState::new();
        state.merge([
            WalletRecord::resolved("low", "0.1000"),
            WalletRecord::failed("bad", "Invalid address format"),
            WalletRecord::resolved("high", "12.0000"),
            WalletRecord::pending("later"),
        ]);

        assert_eq!(state.summary(), Summary { total: 4, completed: 3, errors: 1 });
        let order: Vec<_> = state.ranked().iter().map(|r| r.address.as_str()).collect();
        assert_eq!(order, vec!["high", "low", "bad", "later"]);
    }

    #[test]
    fn test_restore_persist_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = ClientState::with_store(SnapshotStore::in_dir(dir.path()));
        state.merge([WalletRecord::resolved("a", "1.0000")]);
        state.persist().unwrap();

        let restored = ClientState::restore(SnapshotStore::in_dir(dir.path())).unwrap();
        assert_eq!(restored.records(), state.records());

        state.clear().unwrap();
        assert!(state.records().is_empty());
        let empty = ClientState::restore(SnapshotStore::in_dir(dir.path())).unwrap();
        assert!(empty.records().is_empty());
    }

    #[test]
    fn test_stale_snapshot_not_restored() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::in_dir(dir.path());
        store
            .write(&CacheSnapshot {
                wallets: vec![WalletRecord::resolved("a", "1.0000")],
                last_updated: now_millis() - 25 * 60 * 60 * 1000,
            })
            .unwrap();

        let state = ClientState::restore(store.clone()).unwrap();
        assert!(state.records().is_empty());
        assert!(!store.path().exists());
    }
}
