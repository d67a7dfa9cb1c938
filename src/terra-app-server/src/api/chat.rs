//! Chat endpoint.

use std::sync::Arc;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
};
use terra_engine::DEFAULT_SESSION_ID;
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

use super::types::{ChatReply, ChatRequest};

/// Header naming the conversation when the body does not.
pub const SESSION_ID_HEADER: &str = "X-Session-Id";

/// Send one user message and return the assistant's reply.
///
/// Any body that does not yield a string `message` is answered like an
/// empty message, except one over the size limit.
pub async fn chat(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> AppResult<Json<ChatReply>> {
    let Json(request) = payload.map_err(|rejection| {
        debug!(error = %rejection, "Rejected chat request body");
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge
        } else {
            AppError::InvalidInput
        }
    })?;

    let session_id = resolve_session_id(request.session_id, &headers);
    let message = request.message.unwrap_or_default();

    let reply = state
        .conversations
        .handle_message(&session_id, &message)
        .await?;

    Ok(Json(ChatReply { reply }))
}

/// Body field first, then header, then the shared default session.
fn resolve_session_id(from_body: Option<String>, headers: &HeaderMap) -> String {
    from_body
        .filter(|id| !id.is_empty())
        .or_else(|| {
            headers
                .get(SESSION_ID_HEADER)
                .and_then(|v| v.to_str().ok())
                .filter(|id| !id.is_empty())
                .map(String::from)
        })
        .unwrap_or_else(|| DEFAULT_SESSION_ID.to_string())
}
