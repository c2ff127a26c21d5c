//! WebSocket connection handlers.

use std::sync::Arc;

use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures_util::{sink::SinkExt, stream::StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::{domain::Outbound, infrastructure::dto::SessionIdMessage, ui::state::AppState};

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
}

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConnectQuery>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, query.session_id))
}

/// Spawns a task that drains the session's outbound queue into the WebSocket.
///
/// The queue ends when the session is taken over by a newer connection or
/// unregistered; the socket is then closed.
fn pusher_loop(
    mut rx: mpsc::UnboundedReceiver<Outbound>,
    mut sender: futures_util::stream::SplitSink<WebSocket, Message>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            let message = match frame {
                Outbound::Text(text) => Message::Text(text.into()),
                Outbound::Binary(bytes) => Message::Binary(bytes.into()),
            };
            if let Err(e) = sender.send(message).await {
                tracing::debug!("Stopped pushing, send failed: {}", e);
                break;
            }
        }
        if let Err(e) = sender.close().await {
            tracing::debug!("Close after push loop ended: {}", e);
        }
    })
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, requested: Option<String>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let connected = state
        .connect_session_usecase
        .execute(requested.as_deref(), tx)
        .await;
    let session_id = connected.session_id.clone();

    let (mut sender, mut receiver) = socket.split();

    // The handshake is always the first frame on the socket
    let handshake = SessionIdMessage::new(&session_id);
    let sent = match serde_json::to_string(&handshake) {
        Ok(json) => sender.send(Message::Text(json.into())).await.map_err(|e| e.to_string()),
        Err(e) => Err(e.to_string()),
    };
    if let Err(e) = sent {
        tracing::error!("Failed to send session id to '{}': {}", session_id, e);
        state
            .disconnect_session_usecase
            .execute(&session_id, connected.connection_id)
            .await;
        return;
    }
    tracing::info!("Sent session id to '{}'", session_id);

    let session_id_for_recv = session_id.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    tracing::debug!("Ignoring text from '{}': {}", session_id_for_recv, text);
                }
                Ok(Message::Binary(bytes)) => {
                    tracing::debug!(
                        "Ignoring {} bytes from '{}'",
                        bytes.len(),
                        session_id_for_recv
                    );
                }
                Ok(Message::Close(_)) => {
                    tracing::info!("Session '{}' requested close", session_id_for_recv);
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!("WebSocket error for '{}': {}", session_id_for_recv, e);
                    break;
                }
            }
        }
    });

    let mut send_task = pusher_loop(rx, sender);

    // If any one of the tasks completes, abort the other
    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    };

    state
        .disconnect_session_usecase
        .execute(&session_id, connected.connection_id)
        .await;
}
