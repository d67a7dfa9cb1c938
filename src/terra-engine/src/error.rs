//! Error types for Terra Engine.

use thiserror::Error;

/// Result type alias for conversation operations.
pub type Result<T> = std::result::Result<T, ChatError>;

/// Failure reported by a completion provider.
///
/// The variants only matter for operator logs; callers of the chat endpoint
/// see the same generic failure for all of them.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Server returned {status}: {body}")]
    Server { status: u16, body: String },

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("API key not configured")]
    MissingApiKey,
}

/// Error returned by a chat exchange.
#[derive(Debug, Error)]
pub enum ChatError {
    /// The user message was empty or absent.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The completion provider failed.
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),
}

impl ChatError {
    /// Whether this error was caused by the caller rather than the provider.
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidInput(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_converts() {
        let err: ChatError = ProviderError::Server {
            status: 429,
            body: "slow down".to_string(),
        }
        .into();
        assert!(!err.is_invalid_input());
        assert_eq!(err.to_string(), "Provider error: Server returned 429: slow down");
    }

    #[test]
    fn test_invalid_input() {
        let err = ChatError::InvalidInput("empty message".to_string());
        assert!(err.is_invalid_input());
    }
}
