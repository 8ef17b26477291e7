//! Tracks the single active scan run.
//!
//! A new submission either supersedes the running one (cancelling it) or is
//! refused, depending on configuration. Runs never interleave on shared
//! state.

use arc_swap::ArcSwapOption;
use std::sync::Arc;
use uuid::Uuid;

use crate::lifecycle::{cancel_pair, CancelHandle, CancelSignal};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RunError {
    #[error("A scan is already in progress ({0})")]
    Busy(Uuid),
}

#[derive(Debug)]
struct ActiveRun {
    id: Uuid,
    cancel: CancelHandle,
}

/// Holder of the current run's identity and cancel handle.
#[derive(Debug)]
pub struct RunRegistry {
    current: ArcSwapOption<ActiveRun>,
    supersede: bool,
}

impl RunRegistry {
    pub fn new(supersede: bool) -> Self {
        Self {
            current: ArcSwapOption::empty(),
            supersede,
        }
    }

    /// Register a new run.
    pub fn begin(&self) -> Result<(Uuid, CancelSignal), RunError> {
        let (handle, signal) = cancel_pair();
        let run = Arc::new(ActiveRun {
            id: Uuid::new_v4(),
            cancel: handle,
        });

        let supersede = self.supersede;
        let mut busy = None;
        let previous = self.current.rcu(|current| {
            busy = None;
            match current {
                Some(existing) if !supersede => {
                    busy = Some(existing.id);
                    current.clone()
                }
                _ => Some(run.clone()),
            }
        });

        if let Some(existing) = busy {
            return Err(RunError::Busy(existing));
        }
        if let Some(previous) = previous {
            tracing::info!(previous = %previous.id, next = %run.id, "Superseding in-flight run");
            previous.cancel.cancel();
        }

        Ok((run.id, signal))
    }

    /// Clear `id` if it is still the active run.
    pub fn finish(&self, id: Uuid) {
        self.current.rcu(|current| match current {
            Some(run) if run.id == id => None,
            _ => current.clone(),
        });
    }

    /// Cancel the active run, if any. It stays registered until it finishes.
    pub fn cancel_active(&self) -> Option<Uuid> {
        let run = self.current.load_full()?;
        run.cancel.cancel();
        tracing::info!(run = %run.id, "Active run cancelled");
        Some(run.id)
    }

    pub fn active(&self) -> Option<Uuid> {
        self.current.load_full().map(|run| run.id)
    }

    /// Whether `id` still owns the registry. False once superseded or finished.
    pub fn is_active(&self, id: Uuid) -> bool {
        self.current.load().as_ref().is_some_and(|run| run.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supersede_cancels_previous() {
        let registry = RunRegistry::new(true);
        let (first, first_signal) = registry.begin().unwrap();
        let (second, second_signal) = registry.begin().unwrap();

        assert_ne!(first, second);
        assert!(first_signal.is_cancelled());
        assert!(!second_signal.is_cancelled());
        assert_eq!(registry.active(), Some(second));
        assert!(!registry.is_active(first));
        assert!(registry.is_active(second));

        // A stale finish does not clear the newer run.
        registry.finish(first);
        assert_eq!(registry.active(), Some(second));
        registry.finish(second);
        assert_eq!(registry.active(), None);
    }

    #[test]
    fn test_refuses_when_not_superseding() {
        let registry = RunRegistry::new(false);
        let (first, signal) = registry.begin().unwrap();
        assert_eq!(registry.begin().unwrap_err(), RunError::Busy(first));
        assert!(!signal.is_cancelled());

        registry.finish(first);
        assert!(registry.begin().is_ok());
    }

    #[test]
    fn test_cancel_active() {
        let registry = RunRegistry::new(true);
        assert_eq!(registry.cancel_active(), None);
        let (id, signal) = registry.begin().unwrap();
        assert_eq!(registry.cancel_active(), Some(id));
        assert!(signal.is_cancelled());
    }
}
