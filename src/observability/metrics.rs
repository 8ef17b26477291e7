//! Metrics collection and exposition.
//!
//! # Metrics
//! - `scanner_balance_queries_total` (counter): provider queries by outcome
//! - `scanner_balance_query_duration_seconds` (histogram): provider latency
//! - `scanner_retries_total` (counter): backoff waits taken
//! - `scanner_endpoint_quarantined_total` (counter): quarantines by endpoint
//! - `scanner_pool_resets_total` (counter): full quarantine resets
//! - `scanner_items_settled_total` (counter): terminal records by outcome
//! - `scanner_ingested_lines_total` (counter): lines read in the processing pass
//! - `scanner_progress_peers` (gauge): attached observers
//! - `scanner_progress_dropped_total` (counter): events skipped for slow peers

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter with an HTTP listener on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_balance_query(outcome: &'static str, started: Instant) {
    counter!("scanner_balance_queries_total", "outcome" => outcome).increment(1);
    histogram!("scanner_balance_query_duration_seconds").record(started.elapsed().as_secs_f64());
}

pub fn record_retry() {
    counter!("scanner_retries_total").increment(1);
}

pub fn record_endpoint_quarantined(endpoint: &str) {
    counter!("scanner_endpoint_quarantined_total", "endpoint" => endpoint.to_string()).increment(1);
}

pub fn record_pool_reset() {
    counter!("scanner_pool_resets_total").increment(1);
}

pub fn record_item_settled(outcome: &'static str) {
    counter!("scanner_items_settled_total", "outcome" => outcome).increment(1);
}

pub fn record_ingested_lines(lines: u64) {
    counter!("scanner_ingested_lines_total").increment(lines);
}

pub fn record_peer_count(peers: usize) {
    gauge!("scanner_progress_peers").set(peers as f64);
}

pub fn record_progress_dropped() {
    counter!("scanner_progress_dropped_total").increment(1);
}
