//! OpenAI chat completions client

use std::time::Duration;

use async_trait::async_trait;

use super::CompletionProvider;
use super::models::{ChatRequest, ChatResponse};
use crate::error::ProviderError;
use crate::message::Message;

/// Default OpenAI API base URL
pub const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for the OpenAI chat completions endpoint
#[derive(Clone)]
pub struct OpenAIClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl std::fmt::Debug for OpenAIClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAIClient")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl OpenAIClient {
    /// Create a new client
    ///
    /// # Arguments
    /// * `api_key` - Bearer token; requests fail with [`ProviderError::MissingApiKey`] when absent
    /// * `base_url` - API root (e.g., "https://api.openai.com/v1")
    /// * `request_timeout` - Upper bound on a whole completion request
    pub fn new(
        api_key: Option<String>,
        base_url: impl Into<String>,
        request_timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(request_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.filter(|k| !k.is_empty()),
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Send a chat completion request
    pub async fn chat_completion(&self, request: &ChatRequest) -> Result<ChatResponse, ProviderError> {
        let api_key = self.api_key.as_deref().ok_or(ProviderError::MissingApiKey)?;
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Server {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl CompletionProvider for OpenAIClient {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, history: &[Message], model: &str) -> Result<Message, ProviderError> {
        let request = ChatRequest::new(model, history.to_vec());
        let response = self.chat_completion(&request).await?;

        if let Some(usage) = &response.usage {
            tracing::debug!(
                model = %response.model,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Chat completion finished"
            );
        }

        let content = response
            .content()
            .ok_or_else(|| ProviderError::InvalidResponse("no message content in first choice".into()))?;
        Ok(Message::assistant(content.trim()))
    }
}
