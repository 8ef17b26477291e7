//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the scanner.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Public Ethereum mainnet RPC endpoints used when no list is configured.
pub const DEFAULT_RPC_ENDPOINTS: &[&str] = &[
    "https://rpc.ankr.com/eth",
    "https://1rpc.io/eth",
    "https://eth.llamarpc.com",
    "https://eth.public-rpc.com",
    "https://ethereum.publicnode.com",
    "https://eth-mainnet.public.blastapi.io",
    "https://ethereum.blockpi.network/v1/rpc/public",
    "https://eth.drpc.org",
    "https://eth.merkle.io",
    "https://eth.api.onfinality.io/public",
    "https://api.securerpc.com/v1",
];

/// Root configuration for the balance scanner.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ScannerConfig {
    /// Listener configuration (bind address, request timeout).
    pub listener: ListenerConfig,

    /// RPC provider pool.
    pub rpc: RpcConfig,

    /// Batch scheduling and retry policy.
    pub scheduler: SchedulerConfig,

    /// File ingestion limits.
    pub ingest: IngestConfig,

    /// Progress push channel.
    pub channel: ChannelConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:5000").
    pub bind_address: String,

    /// Timeout for JSON routes in seconds. Uploads are not time-boxed.
    pub request_timeout_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:5000".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// RPC endpoint pool configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RpcConfig {
    /// Provider URLs, in round-robin order.
    pub endpoints: Vec<String>,

    /// Per-query timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            endpoints: DEFAULT_RPC_ENDPOINTS.iter().map(|s| s.to_string()).collect(),
            request_timeout_secs: 10,
        }
    }
}

/// Batch scheduler configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Items resolved concurrently per batch.
    pub batch_size: usize,

    /// Retries per item after the first attempt.
    pub max_retries: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,

    /// Extra random delay as a fraction of the computed backoff (0.0 disables).
    pub jitter_ratio: f64,

    /// Cancel the in-flight run when a new submission arrives.
    /// When false, a second submission is rejected while one is running.
    pub supersede_in_flight: bool,

    /// Cancel the active run once the last observer disconnects.
    pub cancel_on_disconnect: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            batch_size: 5,
            max_retries: 3,
            base_delay_ms: 1000,
            max_delay_ms: 60_000,
            jitter_ratio: 0.0,
            supersede_in_flight: true,
            cancel_on_disconnect: false,
        }
    }
}

/// File ingestion configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Lines grouped into one progress event.
    pub chunk_size: usize,

    /// Upload ceiling in bytes.
    pub max_upload_bytes: u64,

    /// Body ceiling for JSON submissions in bytes.
    pub max_json_bytes: usize,

    /// Directory for spooled uploads (system temp dir when unset).
    pub temp_dir: Option<String>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            max_upload_bytes: 500 * 1024 * 1024,
            max_json_bytes: 16 * 1024 * 1024,
            temp_dir: None,
        }
    }
}

/// Progress channel configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Messages buffered per observer before it is treated as slow.
    pub peer_queue_depth: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            peer_queue_depth: 256,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_values() {
        let config = ScannerConfig::default();
        assert_eq!(config.rpc.endpoints.len(), 11);
        assert_eq!(config.scheduler.batch_size, 5);
        assert_eq!(config.scheduler.max_retries, 3);
        assert_eq!(config.scheduler.base_delay_ms, 1000);
        assert_eq!(config.ingest.max_upload_bytes, 524_288_000);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: ScannerConfig = toml::from_str(
            r#"
            [scheduler]
            batch_size = 10

            [rpc]
            endpoints = ["http://127.0.0.1:8545"]
            "#,
        )
        .unwrap();

        assert_eq!(config.scheduler.batch_size, 10);
        assert_eq!(config.scheduler.max_retries, 3);
        assert_eq!(config.rpc.endpoints, vec!["http://127.0.0.1:8545"]);
        assert_eq!(config.listener.bind_address, "0.0.0.0:5000");
    }
}
