//! Push-channel peers over WebSocket.
//!
//! # Data Flow
//! ```text
//! GET /ws (upgrade)
//!     → ProgressChannel::attach (bounded queue)
//!     → loop: queue frame → socket | socket text → ClientMessage
//!     → detach on close, error, or channel shutdown
//! ```

use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    extract::State,
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use uuid::Uuid;

use crate::http::server::AppState;
use crate::progress::{ClientMessage, PushMessage};

pub async fn upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| serve_peer(socket, state))
}

async fn serve_peer(socket: WebSocket, state: AppState) {
    let (peer, mut queue) = state.channel.attach();
    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            frame = queue.recv() => match frame {
                Some(frame) => {
                    if sink.send(Message::Text(frame.to_string().into())).await.is_err() {
                        break;
                    }
                }
                None => {
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                }
            },
            inbound = stream.next() => match inbound {
                Some(Ok(Message::Text(text))) => handle_client_message(&state, peer, text.as_str()),
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!(peer = %peer, error = %e, "WebSocket read failed");
                    break;
                }
            },
        }
    }

    let remaining = state.channel.detach(peer);
    if remaining == 0 && state.config.scheduler.cancel_on_disconnect {
        if let Some(run) = state.runs.cancel_active() {
            tracing::info!(run = %run, "Last observer left, run cancelled");
        }
    }
}

fn handle_client_message(state: &AppState, peer: Uuid, text: &str) {
    match serde_json::from_str::<ClientMessage>(text) {
        Ok(ClientMessage::Ping) => {
            state.channel.send_to(peer, &PushMessage::Pong);
        }
        Ok(ClientMessage::Cancel) => match state.runs.cancel_active() {
            Some(run) => tracing::info!(peer = %peer, run = %run, "Run cancelled by observer"),
            None => tracing::debug!(peer = %peer, "Cancel received with no active run"),
        },
        Err(e) => tracing::warn!(peer = %peer, error = %e, "Ignoring malformed client message"),
    }
}
