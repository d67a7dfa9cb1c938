//! Application state management.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::http::HeaderValue;
use terra_engine::{CompletionProvider, ConversationManager, OpenAIClient};
use tracing::{debug, info, warn};

use crate::config::ServerConfig;

const CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

/// Application state shared across request handlers.
pub struct AppState {
    /// Server configuration.
    pub config: ServerConfig,
    /// Conversation sessions and the provider behind them.
    pub conversations: ConversationManager,
    /// Parsed CORS origin.
    cors_origin: HeaderValue,
    /// Start time.
    start_time: Instant,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("conversations", &self.conversations)
            .field("start_time", &self.start_time)
            .finish()
    }
}

impl AppState {
    /// Create application state backed by the OpenAI client.
    pub fn new(config: ServerConfig) -> anyhow::Result<Self> {
        let client = OpenAIClient::new(
            config.provider.openai_api_key.clone(),
            config.provider.openai_base_url.clone(),
            config.provider.request_timeout_duration(),
        )?;

        info!(base_url = %client.base_url(), "Using OpenAI endpoint");
        if !client.has_api_key() {
            warn!("OPENAI_API_KEY is not set; every chat request will fail");
        }

        Self::with_provider(config, Arc::new(client))
    }

    /// Create application state with an explicit completion provider.
    pub fn with_provider(
        config: ServerConfig,
        provider: Arc<dyn CompletionProvider>,
    ) -> anyhow::Result<Self> {
        config.validate()?;

        let cors_origin = HeaderValue::from_str(&config.cors_origin)
            .map_err(|e| anyhow::anyhow!("Invalid CORS origin '{}': {e}", config.cors_origin))?;

        let conversations = ConversationManager::new(
            provider,
            config.provider.model.clone(),
            config.conversation.system_prompt.clone(),
            config.conversation.limits(),
            config.conversation.session_limits(),
        );

        Ok(Self {
            config,
            conversations,
            cors_origin,
            start_time: Instant::now(),
        })
    }

    /// Start background cleanup task that runs periodically.
    /// Call this after wrapping AppState in Arc to start the cleanup loop.
    pub fn start_cleanup_task(self: &Arc<Self>) {
        let state = Arc::clone(self);

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(CLEANUP_INTERVAL);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                interval.tick().await;
                let sessions = state.conversations.sessions();
                sessions.cleanup_expired().await;
                debug!(
                    "Background cleanup completed. Active sessions: {}",
                    sessions.len().await
                );
            }
        });
    }

    pub fn cors_origin(&self) -> &HeaderValue {
        &self.cors_origin
    }

    /// Get uptime duration.
    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }
}
