//! WebSocket upgrade handler

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        ConnectInfo, State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::app::AppState;
use crate::game::PongMatch;
use crate::util::rate_limit::InputRateLimiter;
use crate::ws::registry::{ConnId, ConnectionHandle, Outbound};

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, addr, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, addr: SocketAddr, state: AppState) {
    let (ws_sink, ws_stream) = socket.split();

    let (handle, outbound_rx) = ConnectionHandle::new(state.config.outbound_buffer);
    let conn_id = handle.id;
    info!(conn_id = %conn_id, peer = %addr, "New WebSocket connection");

    // Spawn writer task: registry queue -> WebSocket
    let writer_handle = tokio::spawn(write_loop(conn_id, ws_sink, outbound_rx));

    // Registry now owns the only sender; eviction closes the writer
    state.game.connect(handle);

    let rate_limiter = InputRateLimiter::new(state.config.input_rate_limit);
    read_loop(conn_id, ws_stream, &state.game, &rate_limiter).await;

    // Cleanup on disconnect
    state.game.disconnect(&conn_id);
    writer_handle.abort();

    info!(conn_id = %conn_id, peer = %addr, "WebSocket connection closed");
}

/// Reader loop: WebSocket -> match
async fn read_loop(
    conn_id: ConnId,
    mut ws_stream: futures::stream::SplitStream<WebSocket>,
    game: &Arc<PongMatch>,
    rate_limiter: &InputRateLimiter,
) {
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                if !rate_limiter.check() {
                    warn!(conn_id = %conn_id, "Rate limited input message");
                    continue;
                }

                debug!(conn_id = %conn_id, message = %text, "Message from client");
                game.handle_message(conn_id, &text);
            }
            Ok(Message::Binary(_)) => {
                warn!(conn_id = %conn_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) => {
                debug!(conn_id = %conn_id, "Received ping");
            }
            Ok(Message::Pong(_)) => {
                debug!(conn_id = %conn_id, "Received pong");
            }
            Ok(Message::Close(_)) => {
                info!(conn_id = %conn_id, "Client initiated close");
                break;
            }
            Err(e) => {
                error!(conn_id = %conn_id, error = %e, "WebSocket error");
                break;
            }
        }
    }
}

/// Writer loop: drains queued frames until closed or evicted
async fn write_loop(
    conn_id: ConnId,
    mut ws_sink: futures::stream::SplitSink<WebSocket, Message>,
    mut outbound_rx: mpsc::Receiver<Outbound>,
) {
    while let Some(frame) = outbound_rx.recv().await {
        match frame {
            Outbound::Text(payload) => {
                if let Err(e) = ws_sink.send(Message::Text(payload.to_string())).await {
                    debug!(conn_id = %conn_id, error = %e, "WebSocket send failed");
                    return;
                }
            }
            Outbound::Close => {
                let _ = ws_sink.send(Message::Close(None)).await;
                break;
            }
        }
    }

    // Queue closed (evicted) or close requested
    let _ = ws_sink.close().await;
}
