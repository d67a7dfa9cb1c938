//! Terra Engine - conversation core for the Terra chat service.
//!
//! This crate provides:
//! - Role-tagged chat messages and a bounded conversation history
//! - A session store with one independently locked history per session,
//!   bounded by a session cap and an idle timeout
//! - The [`CompletionProvider`] seam and an OpenAI chat-completions client
//! - The [`ConversationManager`] tying the above into a single exchange

#![deny(clippy::print_stdout, clippy::print_stderr)]

pub mod conversation;
pub mod error;
pub mod message;
pub mod prompt;
pub mod provider;
pub mod session;

pub use conversation::{ConversationHistory, ConversationManager, HistoryLimits};
pub use error::{ChatError, ProviderError, Result};
pub use message::{Message, MessageRole};
pub use prompt::{DEFAULT_MODEL, SYSTEM_PROMPT};
pub use provider::{CompletionProvider, DEFAULT_OPENAI_URL, OpenAIClient};
pub use session::{
    DEFAULT_MAX_SESSIONS, DEFAULT_SESSION_ID, DEFAULT_SESSION_TIMEOUT, Session, SessionLimits,
    SessionStore,
};
