//! Balance scanner library.
//!
//! Resolves native balances for large batches of addresses (or addresses
//! derived from private keys) against a pool of unreliable public RPC
//! providers, pushing progress to connected observers.

pub mod blockchain;
pub mod client;
pub mod config;
pub mod http;
pub mod ingest;
pub mod lifecycle;
pub mod load_balancer;
pub mod observability;
pub mod progress;
pub mod resilience;
pub mod scanner;

pub use config::ScannerConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
