//! Balance scanner server.
//!
//! # Architecture Overview
//!
//! ```text
//!   typed list ──▶ POST /api/scan ─────────────────────┐
//!                                                       ▼
//!   file ──▶ POST /api/upload ──▶ ingest ──▶ items ──▶ scanner (batches)
//!                                   │                   │
//!                                   │ upload events     │ per item, with retries
//!                                   ▼                   ▼
//!                            progress channel ◀──── blockchain resolver
//!                                   │                   │
//!                                   ▼                   ▼
//!                              /ws observers      load_balancer pool ──▶ RPC providers
//! ```

use clap::Parser;
use std::path::PathBuf;
use tokio::net::TcpListener;

use balance_scanner::config::{load_config, ScannerConfig};
use balance_scanner::lifecycle::{signals, Shutdown};
use balance_scanner::observability::{logging, metrics};
use balance_scanner::HttpServer;

#[derive(Parser)]
#[command(name = "balance-scanner", version, about = "Batch native-balance scanner")]
struct Args {
    /// Path to a TOML configuration file. Defaults apply when omitted.
    #[arg(short, long, env = "SCANNER_CONFIG")]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => ScannerConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
    }

    logging::init_logging(&config.observability.log_level);
    tracing::info!("balance-scanner v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        endpoints = config.rpc.endpoints.len(),
        batch_size = config.scheduler.batch_size,
        max_retries = config.scheduler.max_retries,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            signals::wait_for_termination().await;
            shutdown.trigger();
        });
    }

    let server = HttpServer::new(config)?;
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
