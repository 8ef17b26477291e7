//! Shared utilities for integration tests.

#![allow(dead_code)]

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::post, Json, Router};
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

use balance_scanner::config::ScannerConfig;
use balance_scanner::lifecycle::Shutdown;
use balance_scanner::progress::PushMessage;
use balance_scanner::HttpServer;

pub type Observer = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// 2.5 ETH in wei.
pub const BALANCE_2_5_ETH: &str = "0x22b1c8c1227a0000";

pub const ANVIL_ADDRESS: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";
pub const ANVIL_CHECKSUMMED: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";
pub const ANVIL_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

/// How the mock provider answers one JSON-RPC request.
pub enum Reply {
    Result(Value),
    Status(u16),
    /// Answer with a result after a pause.
    Delayed(Duration, Value),
}

type Responder = Arc<dyn Fn(&Value, usize) -> Reply + Send + Sync>;

/// Mock JSON-RPC provider. `respond` sees the request and the 0-based call
/// number.
pub struct MockRpc {
    pub addr: SocketAddr,
    calls: Arc<AtomicUsize>,
}

impl MockRpc {
    pub async fn start<F>(respond: F) -> Self
    where
        F: Fn(&Value, usize) -> Reply + Send + Sync + 'static,
    {
        let calls = Arc::new(AtomicUsize::new(0));
        let state = (Arc::new(respond) as Responder, calls.clone());
        let app = Router::new().route("/", post(rpc_handler)).with_state(state);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Self { addr, calls }
    }

    /// Provider that reports the same balance for every address.
    pub async fn with_balance(hex: &'static str) -> Self {
        Self::start(move |_, _| Reply::Result(json!(hex))).await
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

async fn rpc_handler(
    State((respond, calls)): State<(Responder, Arc<AtomicUsize>)>,
    Json(request): Json<Value>,
) -> axum::response::Response {
    let call = calls.fetch_add(1, Ordering::SeqCst);
    match respond(&request, call) {
        Reply::Result(result) => rpc_result(&request, result),
        Reply::Delayed(pause, result) => {
            tokio::time::sleep(pause).await;
            rpc_result(&request, result)
        }
        Reply::Status(code) => StatusCode::from_u16(code)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            .into_response(),
    }
}

fn rpc_result(request: &Value, result: Value) -> axum::response::Response {
    Json(json!({
        "jsonrpc": "2.0",
        "id": request["id"],
        "result": result,
    }))
    .into_response()
}

/// A URL nothing listens on.
pub async fn dead_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

/// Config with fast retries against the given endpoints.
pub fn test_config(endpoints: Vec<String>) -> ScannerConfig {
    let mut config = ScannerConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.rpc.endpoints = endpoints;
    config.rpc.request_timeout_secs = 5;
    config.scheduler.base_delay_ms = 10;
    config.scheduler.max_delay_ms = 100;
    config
}

pub struct TestScanner {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
}

impl TestScanner {
    pub async fn spawn(config: ScannerConfig) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = Shutdown::new();
        let server = HttpServer::new(config).unwrap();
        let signal = shutdown.subscribe();
        tokio::spawn(async move {
            server.run(listener, signal).await.unwrap();
        });
        Self { addr, shutdown }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Attach an observer. Returns once the server has registered it.
    pub async fn observe(&self) -> Observer {
        let (mut ws, _) = connect_async(format!("ws://{}/ws", self.addr)).await.unwrap();
        ws.send(Message::Text(r#"{"type":"ping"}"#.into())).await.unwrap();
        assert_eq!(next_message(&mut ws).await, PushMessage::Pong);
        ws
    }
}

impl Drop for TestScanner {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Next push message, failing the test after five seconds.
pub async fn next_message(ws: &mut Observer) -> PushMessage {
    try_next_message(ws, Duration::from_secs(5))
        .await
        .expect("timed out waiting for a push message")
}

pub async fn try_next_message(ws: &mut Observer, wait: Duration) -> Option<PushMessage> {
    let deadline = tokio::time::Instant::now() + wait;
    loop {
        let frame = tokio::time::timeout_at(deadline, ws.next()).await.ok()??.ok()?;
        if let Message::Text(text) = frame {
            return Some(serde_json::from_str(text.as_str()).unwrap());
        }
    }
}

/// Collect messages up to and including the final wallet update.
pub async fn collect_run(ws: &mut Observer) -> Vec<PushMessage> {
    let mut messages = Vec::new();
    loop {
        let message = next_message(ws).await;
        let done = matches!(message, PushMessage::WalletUpdate { progress: 100, .. });
        messages.push(message);
        if done {
            return messages;
        }
    }
}
