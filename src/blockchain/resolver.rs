//! Single-address balance resolution.
//!
//! # Data Flow
//! ```text
//! address
//!     → parse_address (ValidationError: stop, no endpoint touched)
//!     → pool.next()
//!     → BalanceQuery::balance_of under timeout
//!     → ok: format_balance | err: pool.mark_failed + NetworkError
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;

use crate::blockchain::client::BalanceQuery;
use crate::blockchain::types::{parse_address, NetworkError, ResolveError};
use crate::blockchain::units::format_balance;
use crate::load_balancer::{Endpoint, EndpointPool};
use crate::observability::metrics;

/// Resolves one address against the shared endpoint pool.
pub struct BalanceResolver {
    pool: Arc<EndpointPool>,
    query: Arc<dyn BalanceQuery>,
    timeout_duration: Duration,
}

impl BalanceResolver {
    pub fn new(pool: Arc<EndpointPool>, query: Arc<dyn BalanceQuery>, timeout_duration: Duration) -> Self {
        Self {
            pool,
            query,
            timeout_duration,
        }
    }

    /// Balance of `address` as a four-decimal string.
    ///
    /// Any transport failure or timeout quarantines the endpoint that was
    /// used; the caller decides whether to try again.
    pub async fn resolve(&self, address: &str) -> Result<String, ResolveError> {
        let parsed = parse_address(address)?;
        let endpoint = self.pool.next();
        let started = Instant::now();

        match timeout(self.timeout_duration, self.query.balance_of(&endpoint, parsed)).await {
            Ok(Ok(wei)) => {
                metrics::record_balance_query("ok", started);
                Ok(format_balance(wei))
            }
            Ok(Err(e)) => Err(self.fail(&endpoint, e.to_string(), started)),
            Err(_) => Err(self.fail(
                &endpoint,
                format!("timeout after {}s", self.timeout_duration.as_secs()),
                started,
            )),
        }
    }

    fn fail(&self, endpoint: &Endpoint, message: String, started: Instant) -> ResolveError {
        tracing::warn!(endpoint = %endpoint, error = %message, "Balance query failed");
        metrics::record_balance_query("error", started);
        self.pool.mark_failed(endpoint);
        NetworkError {
            endpoint: endpoint.to_string(),
            message,
        }
        .into()
    }

    pub fn pool(&self) -> &Arc<EndpointPool> {
        &self.pool
    }
}

impl std::fmt::Debug for BalanceResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BalanceResolver")
            .field("endpoints", &self.pool.len())
            .field("timeout", &self.timeout_duration)
            .finish()
    }
}
