//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Build the shared scanner state (pool, resolver, scheduler, channel)
//! - Create the Axum router with all handlers
//! - Wire up middleware (tracing, limits, request ID, timeouts)
//! - Serve until shutdown, then cancel the active run and drop observers

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::blockchain::{AlloyBalanceQuery, BalanceQuery, BalanceResolver, KeyDerivation, Secp256k1Derivation};
use crate::config::ScannerConfig;
use crate::http::{handlers, websocket};
use crate::lifecycle::CancelSignal;
use crate::load_balancer::{EndpointPool, PoolError};
use crate::progress::ProgressChannel;
use crate::scanner::{BatchScheduler, RunRegistry};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ScannerConfig>,
    pub pool: Arc<EndpointPool>,
    pub scheduler: Arc<BatchScheduler>,
    pub deriver: Arc<dyn KeyDerivation>,
    pub channel: Arc<ProgressChannel>,
    pub runs: Arc<RunRegistry>,
}

/// HTTP server for the balance scanner.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    /// Create a server that queries the configured providers.
    pub fn new(config: ScannerConfig) -> Result<Self, PoolError> {
        let pool = Arc::new(EndpointPool::new(&config.rpc.endpoints)?);
        let query = Arc::new(AlloyBalanceQuery::for_pool(&pool));
        Ok(Self::with_query(config, pool, query))
    }

    /// Create a server over an explicit pool and query implementation.
    pub fn with_query(config: ScannerConfig, pool: Arc<EndpointPool>, query: Arc<dyn BalanceQuery>) -> Self {
        let resolver = Arc::new(BalanceResolver::new(
            pool.clone(),
            query,
            Duration::from_secs(config.rpc.request_timeout_secs),
        ));
        let scheduler = Arc::new(BatchScheduler::from_config(resolver, &config.scheduler));

        let state = AppState {
            pool,
            scheduler,
            deriver: Arc::new(Secp256k1Derivation),
            channel: Arc::new(ProgressChannel::new(config.channel.peer_queue_depth)),
            runs: Arc::new(RunRegistry::new(config.scheduler.supersede_in_flight)),
            config: Arc::new(config),
        };

        let router = Self::build_router(&state.config, state.clone());
        Self { router, state }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ScannerConfig, state: AppState) -> Router {
        let api = Router::new()
            .route("/api/scan", post(handlers::scan))
            .route("/api/endpoints", get(handlers::endpoints))
            .route("/api/status", get(handlers::status))
            .layer(DefaultBodyLimit::max(config.ingest.max_json_bytes))
            .layer(TimeoutLayer::new(Duration::from_secs(config.listener.request_timeout_secs)));

        // Uploads enforce their own ceiling while spooling and are not time-boxed.
        let uploads = Router::new()
            .route("/api/upload", post(handlers::upload))
            .layer(DefaultBodyLimit::disable());

        Router::new()
            .merge(api)
            .merge(uploads)
            .route("/ws", get(websocket::upgrade))
            .with_state(state)
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown` fires.
    pub async fn run(self, listener: TcpListener, mut shutdown: CancelSignal) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            endpoints = self.state.pool.len(),
            "HTTP server starting"
        );

        let state = self.state.clone();
        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                shutdown.cancelled().await;
                state.runs.cancel_active();
                state.channel.close_all();
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::client::testing::ScriptedQuery;
    use alloy::primitives::U256;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn server(config: ScannerConfig) -> HttpServer {
        let pool = Arc::new(EndpointPool::new(["http://rpc.test"]).unwrap());
        HttpServer::with_query(config, pool, Arc::new(ScriptedQuery::with_fallback(U256::from(1u8))))
    }

    fn scan_request(body: String) -> Request<Body> {
        Request::post("/api/scan")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_status_route_sets_request_id() {
        let response = server(ScannerConfig::default())
            .router
            .oneshot(Request::get("/api/status").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_scan_is_accepted_and_registered() {
        let server = server(ScannerConfig::default());
        let body = serde_json::json!({"entries": ["0x0000000000000000000000000000000000000001"]});

        let response = server.router.oneshot(scan_request(body.to_string())).await.unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let bytes = axum::body::to_bytes(response.into_body(), 4096).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["stats"]["valid"], 1);
        assert!(value["run_id"].is_string());
    }

    #[tokio::test]
    async fn test_json_body_limit() {
        let mut config = ScannerConfig::default();
        config.ingest.max_json_bytes = 64;
        let body = serde_json::json!({"entries": ["0x".repeat(100)]}).to_string();

        let response = server(config).router.oneshot(scan_request(body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_upload_without_multipart_body_is_rejected() {
        let request = Request::post("/api/upload")
            .header("content-type", "text/plain")
            .body(Body::from("0x0000000000000000000000000000000000000001"))
            .unwrap();

        let response = server(ScannerConfig::default()).router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = axum::body::to_bytes(response.into_body(), 4096).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(value["error"].is_string());
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let response = server(ScannerConfig::default())
            .router
            .oneshot(Request::get("/admin/status").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
