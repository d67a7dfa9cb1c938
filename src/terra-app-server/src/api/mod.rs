//! REST API routes and handlers.

mod chat;
mod health;
pub mod types;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

pub use chat::SESSION_ID_HEADER;
pub use types::{ChatReply, ChatRequest, HealthResponse};

/// Create the API routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/chat", post(chat::chat))
        .route("/health", get(health::health_check))
}
