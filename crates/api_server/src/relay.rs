//! Websocket byte relay.
//!
//! Both websocket routes speak the same trivial protocol: whatever frame a
//! client sends comes straight back. Useful for agents probing liveness and
//! for wiring tests; carries no state beyond a connection counter.

use crate::state::AppState;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{ConnectInfo, State};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use tracing::{info, warn};

/// Upgrade the request and hand the socket to the echo loop.
pub async fn relay_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
) -> Response {
    ws.on_upgrade(move |socket| relay_session(socket, addr, state))
}

async fn relay_session(socket: WebSocket, addr: SocketAddr, state: AppState) {
    state.relay_connections.fetch_add(1, Ordering::Relaxed);
    info!("Relay connection established from {}", addr);

    let (mut sink, mut stream) = socket.split();
    while let Some(message) = stream.next().await {
        match message {
            Ok(Message::Text(text)) => {
                if sink.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
            Ok(Message::Binary(bytes)) => {
                if sink.send(Message::Binary(bytes)).await.is_err() {
                    break;
                }
            }
            Ok(Message::Ping(data)) => {
                let _ = sink.send(Message::Pong(data)).await;
            }
            Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => break,
            Err(err) => {
                warn!(error = %err, "Relay connection error from {}", addr);
                break;
            }
        }
    }

    state.relay_connections.fetch_sub(1, Ordering::Relaxed);
    info!("Relay connection from {} closed", addr);
}
