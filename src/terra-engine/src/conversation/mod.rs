//! Conversation management.

mod history;
mod manager;

pub use history::{ConversationHistory, DEFAULT_MAX_MESSAGES, HistoryLimits};
pub use manager::ConversationManager;
