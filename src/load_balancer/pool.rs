//! Endpoint pool with round-robin selection and quarantine.
//!
//! # Responsibilities
//! - Rotate through provider endpoints, skipping quarantined ones
//! - Quarantine endpoints reported as failed
//! - Clear the whole quarantine set when nothing is left to select
//!
//! The cursor and the quarantine set live behind one mutex so concurrent
//! resolvers never observe a half-updated rotation.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use url::Url;

use crate::load_balancer::endpoint::{Endpoint, EndpointStatus};
use crate::observability::metrics;

/// Errors raised while building a pool.
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("endpoint pool requires at least one endpoint")]
    Empty,

    #[error("invalid endpoint URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

#[derive(Debug, Default)]
struct Selection {
    /// Index of the next candidate.
    cursor: usize,
    quarantined: HashSet<usize>,
}

/// Shared, fixed set of provider endpoints.
#[derive(Debug)]
pub struct EndpointPool {
    endpoints: Vec<Arc<Endpoint>>,
    selection: Mutex<Selection>,
}

impl EndpointPool {
    /// Build a pool from URLs, preserving their order.
    pub fn new<I, S>(urls: I) -> Result<Self, PoolError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let endpoints = urls
            .into_iter()
            .enumerate()
            .map(|(index, raw)| {
                let raw = raw.as_ref();
                Url::parse(raw)
                    .map(|url| Arc::new(Endpoint::new(index, url)))
                    .map_err(|e| PoolError::InvalidUrl {
                        url: raw.to_string(),
                        reason: e.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        if endpoints.is_empty() {
            return Err(PoolError::Empty);
        }

        Ok(Self {
            endpoints,
            selection: Mutex::new(Selection::default()),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Selection> {
        self.selection.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Next non-quarantined endpoint in rotation.
    ///
    /// When every endpoint is quarantined the set is cleared and the first
    /// endpoint is returned, so selection never dead-ends.
    pub fn next(&self) -> Arc<Endpoint> {
        let len = self.endpoints.len();
        let mut selection = self.lock();

        for _ in 0..len {
            let index = selection.cursor;
            selection.cursor = (index + 1) % len;
            if !selection.quarantined.contains(&index) {
                return self.endpoints[index].clone();
            }
        }

        selection.quarantined.clear();
        selection.cursor = 1 % len;
        drop(selection);

        tracing::warn!(endpoints = len, "All endpoints quarantined, resetting pool");
        metrics::record_pool_reset();
        self.endpoints[0].clone()
    }

    /// Quarantine an endpoint. Idempotent.
    pub fn mark_failed(&self, endpoint: &Endpoint) {
        let newly_quarantined = self.lock().quarantined.insert(endpoint.index);
        if newly_quarantined {
            tracing::debug!(endpoint = %endpoint, "Endpoint quarantined");
            metrics::record_endpoint_quarantined(endpoint.as_str());
        }
    }

    pub fn status(&self, endpoint: &Endpoint) -> EndpointStatus {
        if self.lock().quarantined.contains(&endpoint.index) {
            EndpointStatus::Quarantined
        } else {
            EndpointStatus::Available
        }
    }

    /// All endpoints with their current status, in pool order.
    pub fn snapshot(&self) -> Vec<(Arc<Endpoint>, EndpointStatus)> {
        let selection = self.lock();
        self.endpoints
            .iter()
            .map(|endpoint| {
                let status = if selection.quarantined.contains(&endpoint.index) {
                    EndpointStatus::Quarantined
                } else {
                    EndpointStatus::Available
                };
                (endpoint.clone(), status)
            })
            .collect()
    }

    pub fn endpoints(&self) -> &[Arc<Endpoint>] {
        &self.endpoints
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}
