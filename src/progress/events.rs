//! Progress events produced by ingestion and resolution.

use crate::scanner::WalletRecord;

/// Which pipeline stage produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Ingest,
    Resolve,
}

/// Payload carried alongside the counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Chunk {
    /// Addresses read since the previous ingest event.
    Addresses(Vec<String>),
    /// Records settled since the previous resolve event.
    Wallets(Vec<WalletRecord>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    pub phase: Phase,
    /// Whole percent, 0..=100.
    pub progress: u8,
    pub total: usize,
    pub completed: usize,
    pub chunk: Option<Chunk>,
}

impl ProgressEvent {
    pub fn is_final(&self) -> bool {
        self.progress == 100
    }
}
