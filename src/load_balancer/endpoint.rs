//! RPC provider endpoint.

use serde::Serialize;
use url::Url;

/// Selection status of an endpoint. Quarantine is temporary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointStatus {
    Available,
    Quarantined,
}

/// One configured provider URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Position in the pool; stable for the pool's lifetime.
    pub index: usize,
    pub url: Url,
}

impl Endpoint {
    pub fn new(index: usize, url: Url) -> Self {
        Self { index, url }
    }

    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.url.as_str())
    }
}
