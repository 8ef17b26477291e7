//! Shutdown coordination for the scanner.

use crate::lifecycle::cancel::{cancel_pair, CancelHandle, CancelSignal};

/// Coordinator for graceful shutdown.
///
/// Backed by a latched flag, so tasks that subscribe after the trigger still
/// observe it.
#[derive(Debug, Clone)]
pub struct Shutdown {
    handle: CancelHandle,
    signal: CancelSignal,
}

impl Shutdown {
    pub fn new() -> Self {
        let (handle, signal) = cancel_pair();
        Self { handle, signal }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> CancelSignal {
        self.signal.clone()
    }

    /// Trigger the shutdown signal.
    pub fn trigger(&self) {
        if !self.handle.is_cancelled() {
            tracing::info!("Shutdown triggered");
        }
        self.handle.cancel();
    }

    pub fn is_triggered(&self) -> bool {
        self.handle.is_cancelled()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
