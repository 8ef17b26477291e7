//! Configuration validation.
//!
//! Serde handles syntax; this module checks value ranges and that every
//! address and URL parses. All violations are returned, not just the first.

use std::net::SocketAddr;
use url::Url;

use crate::config::schema::ScannerConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {reason}")]
pub struct ConfigViolation {
    pub field: String,
    pub reason: String,
}

impl ConfigViolation {
    fn new(field: &str, reason: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &ScannerConfig) -> Result<(), Vec<ConfigViolation>> {
    let mut violations = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        violations.push(ConfigViolation::new("listener.bind_address", "not a socket address"));
    }
    if config.listener.request_timeout_secs == 0 {
        violations.push(ConfigViolation::new("listener.request_timeout_secs", "must be > 0"));
    }

    if config.rpc.endpoints.is_empty() {
        violations.push(ConfigViolation::new("rpc.endpoints", "at least one endpoint is required"));
    }
    for endpoint in &config.rpc.endpoints {
        match Url::parse(endpoint) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => violations.push(ConfigViolation::new(
                "rpc.endpoints",
                format!("unsupported scheme '{}' in {}", url.scheme(), endpoint),
            )),
            Err(e) => violations.push(ConfigViolation::new(
                "rpc.endpoints",
                format!("invalid URL '{}': {}", endpoint, e),
            )),
        }
    }
    if config.rpc.request_timeout_secs == 0 {
        violations.push(ConfigViolation::new("rpc.request_timeout_secs", "must be > 0"));
    }

    let scheduler = &config.scheduler;
    if scheduler.batch_size == 0 {
        violations.push(ConfigViolation::new("scheduler.batch_size", "must be >= 1"));
    }
    if scheduler.base_delay_ms > scheduler.max_delay_ms {
        violations.push(ConfigViolation::new(
            "scheduler.base_delay_ms",
            "must not exceed scheduler.max_delay_ms",
        ));
    }
    if !(0.0..=1.0).contains(&scheduler.jitter_ratio) {
        violations.push(ConfigViolation::new("scheduler.jitter_ratio", "must be within 0.0..=1.0"));
    }

    if config.ingest.chunk_size == 0 {
        violations.push(ConfigViolation::new("ingest.chunk_size", "must be >= 1"));
    }
    if config.ingest.max_upload_bytes == 0 {
        violations.push(ConfigViolation::new("ingest.max_upload_bytes", "must be >= 1"));
    }

    if config.channel.peer_queue_depth == 0 {
        violations.push(ConfigViolation::new("channel.peer_queue_depth", "must be >= 1"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        violations.push(ConfigViolation::new(
            "observability.metrics_address",
            "not a socket address",
        ));
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}
