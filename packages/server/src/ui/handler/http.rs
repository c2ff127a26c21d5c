//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode};

use crate::{
    infrastructure::dto::{ChatRequestBody, ChatResponseBody, ErrorBody},
    reply::ReplyKind,
    ui::state::AppState,
    usecase::SendChatError,
};

type ApiError = (StatusCode, Json<ErrorBody>);

/// Health check endpoint
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let sessions = state.message_pusher.connected_count().await;
    Json(serde_json::json!({"status": "ok", "sessions": sessions}))
}

/// `POST /api/chat`: text replies unless `action` says otherwise
pub async fn post_chat(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ChatRequestBody>,
) -> Result<Json<ChatResponseBody>, ApiError> {
    dispatch(&state, body, ReplyKind::Text).await
}

/// `POST /api/talk`: audio replies unless `action` says otherwise
pub async fn post_talk(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ChatRequestBody>,
) -> Result<Json<ChatResponseBody>, ApiError> {
    dispatch(&state, body, ReplyKind::Audio).await
}

async fn dispatch(
    state: &AppState,
    body: ChatRequestBody,
    fallback: ReplyKind,
) -> Result<Json<ChatResponseBody>, ApiError> {
    let pending = state
        .send_chat_usecase
        .accept(&body, fallback)
        .await
        .map_err(error_response)?;
    let id = pending.session_id().to_string();

    // Reply is pushed after the HTTP response, like the real backend
    tokio::spawn(async move {
        let session_id = pending.session_id().to_string();
        if let Err(e) = pending.deliver().await {
            tracing::warn!("Failed to push reply to '{}': {}", session_id, e);
        }
    });

    Ok(Json(ChatResponseBody {
        success: true,
        message: "Chat request processed".to_string(),
        id,
    }))
}

fn error_response(error: SendChatError) -> ApiError {
    let status = match error {
        SendChatError::MissingSession => StatusCode::BAD_REQUEST,
        SendChatError::UnknownSession(_) => StatusCode::NOT_FOUND,
    };
    tracing::warn!("Rejected chat request: {}", error);
    (
        status,
        Json(ErrorBody {
            success: false,
            message: error.to_string(),
        }),
    )
}
