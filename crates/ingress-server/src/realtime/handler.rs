//! WebSocket handler
//!
//! Upgrades qualifying connections on the shared listener into real-time
//! sessions and pumps frames between the session queue and the socket.

use crate::state::AppState;
use axum::{
    extract::{ws::Message, State, WebSocketUpgrade},
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};

/// Channel buffer size for outgoing frames
const FRAME_BUFFER_SIZE: usize = 100;

/// WebSocket upgrade handler for the `/socket` route
pub async fn socket_handler(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(state, socket))
}

/// Handle an upgraded WebSocket connection
async fn handle_socket(state: AppState, socket: axum::extract::ws::WebSocket) {
    let session_id = uuid::Uuid::new_v4().to_string();

    // Create frame channel for outgoing messages
    let (tx, mut rx) = tokio::sync::mpsc::channel(FRAME_BUFFER_SIZE);

    state
        .transport()
        .connections()
        .add_connection(session_id.clone(), tx);

    tracing::info!(session_id = %session_id, "Real-time session established");

    let (mut ws_sink, mut ws_stream) = socket.split();

    let session_id_recv = session_id.clone();

    // Task receiving frames from the client
    //
    // Text frames are opaque at this layer; interpreting them (identify,
    // join, typing, ...) is collaborator logic.
    let recv_task = tokio::spawn(async move {
        while let Some(msg) = ws_stream.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    tracing::debug!(
                        session_id = %session_id_recv,
                        len = text.len(),
                        "Client frame received"
                    );
                }
                Ok(Message::Binary(_)) => {
                    tracing::debug!(
                        session_id = %session_id_recv,
                        "Binary frames not supported"
                    );
                    return;
                }
                Ok(Message::Ping(_) | Message::Pong(_)) => {
                    tracing::trace!(session_id = %session_id_recv, "Ping/pong");
                }
                Ok(Message::Close(_)) => {
                    tracing::info!(session_id = %session_id_recv, "Client closed session");
                    return;
                }
                Err(e) => {
                    tracing::warn!(
                        session_id = %session_id_recv,
                        error = %e,
                        "WebSocket error"
                    );
                    return;
                }
            }
        }
    });

    let session_id_send = session_id.clone();

    // Task delivering queued frames to the client
    let send_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if let Ok(json) = frame.to_json() {
                if ws_sink.send(Message::Text(json.into())).await.is_err() {
                    tracing::warn!(
                        session_id = %session_id_send,
                        "Failed to deliver frame to session"
                    );
                    break;
                }
            }
        }

        // Close the socket when the session queue is gone
        let _ = ws_sink.close().await;
    });

    // Either direction ending tears the session down
    tokio::select! {
        _ = recv_task => {
            tracing::debug!(session_id = %session_id, "Receive task ended");
        }
        _ = send_task => {
            tracing::debug!(session_id = %session_id, "Send task ended");
        }
    }

    if let Err(e) = state.transport().disconnect(&session_id).await {
        tracing::warn!(session_id = %session_id, error = %e, "Session teardown error");
    }

    tracing::info!(session_id = %session_id, "Real-time session closed");
}
