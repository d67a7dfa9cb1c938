//! Conversation manager.

use std::sync::Arc;

use tracing::{debug, error, info};

use super::history::HistoryLimits;
use crate::error::{ChatError, Result};
use crate::message::Message;
use crate::provider::CompletionProvider;
use crate::session::{SessionLimits, SessionStore};

/// Runs chat exchanges against per-session histories.
pub struct ConversationManager {
    sessions: SessionStore,
    provider: Arc<dyn CompletionProvider>,
    model: String,
    limits: HistoryLimits,
}

impl std::fmt::Debug for ConversationManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationManager")
            .field("provider", &self.provider.name())
            .field("model", &self.model)
            .field("limits", &self.limits)
            .finish()
    }
}

impl ConversationManager {
    /// Create a new conversation manager.
    pub fn new(
        provider: Arc<dyn CompletionProvider>,
        model: impl Into<String>,
        system_prompt: impl Into<String>,
        limits: HistoryLimits,
        session_limits: SessionLimits,
    ) -> Self {
        Self {
            sessions: SessionStore::new(system_prompt, session_limits),
            provider,
            model: model.into(),
            limits,
        }
    }

    /// Get the model.
    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn limits(&self) -> HistoryLimits {
        self.limits
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Send `user_text` on `session_id` and return the assistant reply.
    ///
    /// The session lock is held for the whole exchange. The user message is
    /// only committed together with the reply, so a failed completion leaves
    /// the history as it was.
    pub async fn handle_message(&self, session_id: &str, user_text: &str) -> Result<String> {
        if user_text.is_empty() {
            return Err(ChatError::InvalidInput("message is empty".to_string()));
        }

        let session = self.sessions.get_or_create(session_id).await;
        let mut history = session.lock().await;

        let user = Message::user(user_text);
        let mut context = Vec::with_capacity(history.len() + 1);
        context.extend_from_slice(history.messages());
        context.push(user.clone());

        debug!(
            session_id = %session_id,
            model = %self.model,
            context_len = context.len(),
            "Requesting completion"
        );

        let reply = match self.provider.complete(&context, &self.model).await {
            Ok(reply) => reply,
            Err(e) => {
                error!(
                    session_id = %session_id,
                    provider = %self.provider.name(),
                    error = %e,
                    "Error calling completion provider"
                );
                return Err(e.into());
            }
        };

        let reply_text = reply.content.trim().to_string();
        history.commit_exchange(user, Message::assistant(reply_text.as_str()), self.limits);
        session.touch();

        info!(
            session_id = %session_id,
            history_len = history.len(),
            "Chat exchange completed"
        );

        Ok(reply_text)
    }
}
