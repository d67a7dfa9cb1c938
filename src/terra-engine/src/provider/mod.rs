//! Completion providers.

mod models;
mod openai;

pub use models::{ChatChoice, ChatRequest, ChatResponse, ResponseMessage, Usage};
pub use openai::{DEFAULT_OPENAI_URL, OpenAIClient};

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::message::Message;

/// External service that produces the next assistant message.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Provider name, for logs.
    fn name(&self) -> &str;

    /// Request one completion for `history` from `model`.
    async fn complete(&self, history: &[Message], model: &str) -> Result<Message, ProviderError>;
}
