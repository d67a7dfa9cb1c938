//! Error types for the app server.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use terra_engine::ChatError;
use thiserror::Error;

use crate::api::types::ChatReply;

/// Reply sent when the request carries no usable message.
pub const INVALID_INPUT_REPLY: &str = "Please provide a message.";

/// Reply sent when the request body exceeds the configured limit.
pub const PAYLOAD_TOO_LARGE_REPLY: &str = "Message is too large.";

/// Reply sent for every completion provider failure.
pub const PROVIDER_ERROR_REPLY: &str = "OpenAI API error occurred.";

/// Application error type.
///
/// The display text is what the client receives, so it never carries
/// provider details.
#[derive(Debug, Error)]
pub enum AppError {
    /// Empty, missing or unreadable user message.
    #[error("Please provide a message.")]
    InvalidInput,

    /// Request body over `max_body_size`.
    #[error("Message is too large.")]
    PayloadTooLarge,

    /// Completion provider failure.
    #[error("OpenAI API error occurred.")]
    Provider,
}

impl AppError {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidInput => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Provider => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ChatReply {
            reply: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Result type for the app server.
pub type AppResult<T> = Result<T, AppError>;

impl From<ChatError> for AppError {
    fn from(error: ChatError) -> Self {
        match error {
            ChatError::InvalidInput(_) => Self::InvalidInput,
            ChatError::Provider(_) => Self::Provider,
        }
    }
}
