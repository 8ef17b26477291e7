//! Provider access for balance queries.
//!
//! # Responsibilities
//! - Hold one alloy HTTP provider per pool endpoint
//! - Issue `eth_getBalance` against a specific endpoint
//!
//! Endpoint selection and failure bookkeeping belong to the resolver; this
//! layer only talks to the endpoint it is handed.

use alloy::primitives::{Address, U256};
use alloy::providers::{Provider, ProviderBuilder};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::load_balancer::{Endpoint, EndpointPool};

/// Failure reported by a balance query.
#[derive(Debug, Clone, Error)]
pub enum QueryError {
    #[error("{0}")]
    Transport(String),

    #[error("no provider configured for endpoint {0}")]
    UnknownEndpoint(String),
}

/// Fetches a raw base-unit balance from one endpoint.
#[async_trait]
pub trait BalanceQuery: Send + Sync {
    async fn balance_of(&self, endpoint: &Endpoint, address: Address) -> Result<U256, QueryError>;
}

/// JSON-RPC balance query backed by alloy HTTP providers.
#[derive(Clone)]
pub struct AlloyBalanceQuery {
    providers: HashMap<usize, Arc<dyn Provider + Send + Sync>>,
}

impl AlloyBalanceQuery {
    /// Build one provider per endpoint in the pool.
    pub fn for_pool(pool: &EndpointPool) -> Self {
        let providers = pool
            .endpoints()
            .iter()
            .map(|endpoint| {
                let provider = Arc::new(ProviderBuilder::new().connect_http(endpoint.url.clone()))
                    as Arc<dyn Provider + Send + Sync>;
                (endpoint.index, provider)
            })
            .collect();

        Self { providers }
    }
}

#[async_trait]
impl BalanceQuery for AlloyBalanceQuery {
    async fn balance_of(&self, endpoint: &Endpoint, address: Address) -> Result<U256, QueryError> {
        let provider = self
            .providers
            .get(&endpoint.index)
            .ok_or_else(|| QueryError::UnknownEndpoint(endpoint.to_string()))?;

        provider
            .get_balance(address)
            .await
            .map_err(|e| QueryError::Transport(e.to_string()))
    }
}

impl std::fmt::Debug for AlloyBalanceQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlloyBalanceQuery")
            .field("providers", &self.providers.len())
            .finish()
    }
}
