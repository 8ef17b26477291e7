//! Fan-out of progress messages to attached observers.
//!
//! Each peer owns a bounded queue drained by its socket task. Broadcasting
//! never waits: a full queue skips that peer for this message, a closed one
//! is detached. Attaching later does not replay anything already sent.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use uuid::Uuid;

use crate::observability::metrics;
use crate::progress::messages::PushMessage;

/// Serialized message as queued for peers.
pub type Frame = Arc<str>;

#[derive(Debug)]
pub struct ProgressChannel {
    peers: DashMap<Uuid, mpsc::Sender<Frame>>,
    queue_depth: usize,
}

impl ProgressChannel {
    pub fn new(queue_depth: usize) -> Self {
        Self {
            peers: DashMap::new(),
            queue_depth: queue_depth.max(1),
        }
    }

    /// Register a new peer and return its id and receiving end.
    pub fn attach(&self) -> (Uuid, mpsc::Receiver<Frame>) {
        let (tx, rx) = mpsc::channel(self.queue_depth);
        let id = Uuid::new_v4();
        self.peers.insert(id, tx);
        metrics::record_peer_count(self.peers.len());
        tracing::debug!(peer = %id, peers = self.peers.len(), "Observer attached");
        (id, rx)
    }

    /// Remove a peer. Returns how many remain.
    pub fn detach(&self, id: Uuid) -> usize {
        if self.peers.remove(&id).is_some() {
            tracing::debug!(peer = %id, "Observer detached");
        }
        let remaining = self.peers.len();
        metrics::record_peer_count(remaining);
        remaining
    }

    /// Deliver `message` to every peer attached right now. Returns the number
    /// of peers that accepted it.
    pub fn broadcast(&self, message: &PushMessage) -> usize {
        let Some(frame) = encode(message) else {
            return 0;
        };

        let mut delivered = 0;
        let mut closed = Vec::new();
        for peer in self.peers.iter() {
            match peer.value().try_send(frame.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    tracing::debug!(peer = %peer.key(), "Observer queue full, skipping message");
                    metrics::record_progress_dropped();
                }
                Err(TrySendError::Closed(_)) => closed.push(*peer.key()),
            }
        }
        // Removal happens after iteration; DashMap shards stay locked while iterating.
        for id in closed {
            self.detach(id);
        }
        delivered
    }

    /// Deliver to a single peer.
    pub fn send_to(&self, id: Uuid, message: &PushMessage) -> bool {
        let Some(frame) = encode(message) else {
            return false;
        };
        self.peers
            .get(&id)
            .map(|peer| peer.try_send(frame).is_ok())
            .unwrap_or(false)
    }

    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    /// Drop every peer queue; socket tasks see their receiver close.
    pub fn close_all(&self) {
        let peers = self.peers.len();
        self.peers.clear();
        metrics::record_peer_count(0);
        if peers > 0 {
            tracing::info!(peers, "Closed all observers");
        }
    }
}

fn encode(message: &PushMessage) -> Option<Frame> {
    match serde_json::to_string(message) {
        Ok(json) => Some(Arc::from(json)),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode push message");
            None
        }
    }
}
