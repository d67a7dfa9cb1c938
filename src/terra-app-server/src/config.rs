//! Server configuration.

use std::net::SocketAddr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use terra_engine::{
    DEFAULT_MAX_SESSIONS, DEFAULT_MODEL, DEFAULT_OPENAI_URL, DEFAULT_SESSION_TIMEOUT, HistoryLimits,
    SYSTEM_PROMPT, SessionLimits,
};

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address (e.g., "127.0.0.1:5000").
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// The single origin allowed to call the API (credentials enabled).
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,

    /// Completion provider configuration.
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Conversation history configuration.
    #[serde(default)]
    pub conversation: ConversationConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Maximum request body size in bytes.
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,

    /// Graceful shutdown timeout in seconds.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout: u64,
}

fn default_listen_addr() -> String {
    "127.0.0.1:5000".to_string()
}

fn default_cors_origin() -> String {
    "http://localhost:5173".to_string()
}

fn default_max_body_size() -> usize {
    64 * 1024 // 64KB
}

fn default_shutdown_timeout() -> u64 {
    30
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            cors_origin: default_cors_origin(),
            provider: ProviderConfig::default(),
            conversation: ConversationConfig::default(),
            logging: LoggingConfig::default(),
            max_body_size: default_max_body_size(),
            shutdown_timeout: default_shutdown_timeout(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from a JSON file.
    ///
    /// The API key is still taken from the environment when the file does
    /// not set one.
    pub fn load(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = serde_json::from_str(&content)?;
        if config.provider.openai_api_key.is_none() {
            config.provider.openai_api_key = std::env::var("OPENAI_API_KEY").ok();
        }
        config.validate()?;
        Ok(config)
    }

    /// Load from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("TERRA_LISTEN_ADDR") {
            config.listen_addr = addr;
        }

        if let Ok(origin) = std::env::var("TERRA_CORS_ORIGIN") {
            config.cors_origin = origin;
        }

        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            config.provider.openai_api_key = Some(key);
        }

        if let Ok(url) = std::env::var("OPENAI_BASE_URL") {
            config.provider.openai_base_url = url;
        }

        if let Ok(model) = std::env::var("TERRA_MODEL") {
            config.provider.model = model;
        }

        if let Ok(max) = std::env::var("TERRA_MAX_HISTORY") {
            config.conversation.max_messages = max
                .parse()
                .map_err(|e| anyhow::anyhow!("Invalid TERRA_MAX_HISTORY '{max}': {e}"))?;
        }

        if let Ok(max) = std::env::var("TERRA_MAX_SESSIONS") {
            config.conversation.max_sessions = max
                .parse()
                .map_err(|e| anyhow::anyhow!("Invalid TERRA_MAX_SESSIONS '{max}': {e}"))?;
        }

        if let Ok(secs) = std::env::var("TERRA_SESSION_TIMEOUT") {
            config.conversation.session_timeout = secs
                .parse()
                .map_err(|e| anyhow::anyhow!("Invalid TERRA_SESSION_TIMEOUT '{secs}': {e}"))?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check values that would otherwise fail at startup or at request time.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.socket_addr()?;

        if self.conversation.max_messages < 2 {
            anyhow::bail!(
                "conversation.max_messages must be at least 2, got {}",
                self.conversation.max_messages
            );
        }

        if self.conversation.max_sessions == 0 {
            anyhow::bail!("conversation.max_sessions must be at least 1");
        }

        if self.cors_origin.is_empty() {
            anyhow::bail!("cors_origin must not be empty");
        }

        Ok(())
    }

    /// Parsed listen address.
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        self.listen_addr
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid listen address '{}': {e}", self.listen_addr))
    }
}

/// Provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// OpenAI API key.
    #[serde(default, skip_serializing)]
    pub openai_api_key: Option<String>,
    /// OpenAI base URL override.
    #[serde(default = "default_openai_base_url")]
    pub openai_base_url: String,
    /// Model identifier sent with every completion request.
    #[serde(default = "default_model")]
    pub model: String,
    /// Completion request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
}

fn default_openai_base_url() -> String {
    DEFAULT_OPENAI_URL.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_request_timeout() -> u64 {
    120
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            openai_base_url: default_openai_base_url(),
            model: default_model(),
            request_timeout: default_request_timeout(),
        }
    }
}

impl ProviderConfig {
    /// Get request timeout as Duration.
    pub fn request_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }
}

/// Conversation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationConfig {
    /// Messages kept per session, system message included.
    #[serde(default = "default_max_messages")]
    pub max_messages: usize,
    /// System message every session starts with.
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    /// Maximum live sessions; the least recently used one is evicted beyond this.
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
    /// Idle seconds after which a session is dropped.
    #[serde(default = "default_session_timeout")]
    pub session_timeout: u64,
}

fn default_max_messages() -> usize {
    terra_engine::conversation::DEFAULT_MAX_MESSAGES
}

fn default_system_prompt() -> String {
    SYSTEM_PROMPT.to_string()
}

fn default_max_sessions() -> usize {
    DEFAULT_MAX_SESSIONS
}

fn default_session_timeout() -> u64 {
    DEFAULT_SESSION_TIMEOUT.as_secs()
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            max_messages: default_max_messages(),
            system_prompt: default_system_prompt(),
            max_sessions: default_max_sessions(),
            session_timeout: default_session_timeout(),
        }
    }
}

impl ConversationConfig {
    pub fn limits(&self) -> HistoryLimits {
        HistoryLimits::new(self.max_messages)
    }

    pub fn session_limits(&self) -> SessionLimits {
        SessionLimits::new(self.max_sessions, Duration::from_secs(self.session_timeout))
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (json or pretty).
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}
