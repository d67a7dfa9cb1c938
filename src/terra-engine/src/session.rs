//! Session store.
//!
//! Every session owns its own history behind its own lock. Callers that do
//! not name a session share [`DEFAULT_SESSION_ID`], which is never expired
//! or evicted.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{Mutex, MutexGuard, RwLock};
use tracing::{debug, info};

use crate::conversation::ConversationHistory;
use crate::message::Message;

/// Session used when a request carries no session id.
pub const DEFAULT_SESSION_ID: &str = "default";

/// Default cap on live sessions.
pub const DEFAULT_MAX_SESSIONS: usize = 1000;

/// Default idle time after which a session is dropped.
pub const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(3600);

/// Bounds on how many sessions are kept and for how long.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLimits {
    max_sessions: usize,
    idle_timeout: Duration,
}

impl SessionLimits {
    /// `max_sessions` is raised to 1.
    pub fn new(max_sessions: usize, idle_timeout: Duration) -> Self {
        Self {
            max_sessions: max_sessions.max(1),
            idle_timeout,
        }
    }

    pub fn max_sessions(&self) -> usize {
        self.max_sessions
    }

    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SESSIONS, DEFAULT_SESSION_TIMEOUT)
    }
}

/// One independent conversation.
#[derive(Debug)]
pub struct Session {
    id: String,
    /// Unix millis of the last exchange.
    last_active: AtomicI64,
    history: Mutex<ConversationHistory>,
}

impl Session {
    fn new(id: impl Into<String>, system_prompt: &str) -> Self {
        Self {
            id: id.into(),
            last_active: AtomicI64::new(Utc::now().timestamp_millis()),
            history: Mutex::new(ConversationHistory::new(system_prompt)),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Mark the session as used now.
    pub fn touch(&self) {
        self.last_active
            .store(Utc::now().timestamp_millis(), Ordering::Relaxed);
    }

    fn idle_for(&self, now_ms: i64) -> Duration {
        let idle = now_ms.saturating_sub(self.last_active.load(Ordering::Relaxed));
        Duration::from_millis(u64::try_from(idle).unwrap_or(0))
    }

    fn is_expired(&self, now_ms: i64, timeout: Duration) -> bool {
        self.id != DEFAULT_SESSION_ID && self.idle_for(now_ms) >= timeout
    }

    /// Lock the history for the duration of one exchange.
    pub async fn lock(&self) -> MutexGuard<'_, ConversationHistory> {
        self.history.lock().await
    }
}

/// Sessions by id.
#[derive(Debug)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Arc<Session>>>,
    system_prompt: String,
    limits: SessionLimits,
}

impl SessionStore {
    /// Create an empty store whose sessions start from `system_prompt`.
    pub fn new(system_prompt: impl Into<String>, limits: SessionLimits) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            system_prompt: system_prompt.into(),
            limits,
        }
    }

    /// Get a session, creating it on first use.
    ///
    /// When the store is full, expired sessions are dropped first, then the
    /// least recently active one.
    pub async fn get_or_create(&self, id: &str) -> Arc<Session> {
        if let Some(session) = self.sessions.read().await.get(id) {
            session.touch();
            return Arc::clone(session);
        }

        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions.get(id) {
            session.touch();
            return Arc::clone(session);
        }

        if sessions.len() >= self.limits.max_sessions {
            self.make_room(&mut sessions);
        }

        debug!(session_id = %id, "Created conversation session");
        let session = Arc::new(Session::new(id, &self.system_prompt));
        sessions.insert(id.to_string(), Arc::clone(&session));
        session
    }

    fn make_room(&self, sessions: &mut HashMap<String, Arc<Session>>) {
        let now_ms = Utc::now().timestamp_millis();
        let timeout = self.limits.idle_timeout;
        sessions.retain(|_, session| !session.is_expired(now_ms, timeout));

        while sessions.len() >= self.limits.max_sessions {
            let oldest = sessions
                .values()
                .filter(|s| s.id != DEFAULT_SESSION_ID)
                .max_by_key(|s| s.idle_for(now_ms))
                .map(|s| s.id.clone());
            let Some(oldest) = oldest else { break };
            sessions.remove(&oldest);
            info!(session_id = %oldest, "Evicted least recently used session");
        }
    }

    /// Get an existing session.
    pub async fn get(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions.read().await.get(id).cloned()
    }

    /// Copy of a session's messages, if the session exists.
    pub async fn snapshot(&self, id: &str) -> Option<Vec<Message>> {
        let session = self.get(id).await?;
        let history = session.lock().await;
        Some(history.messages().to_vec())
    }

    /// Drop sessions idle for longer than the configured timeout. Returns
    /// how many were removed.
    pub async fn cleanup_expired(&self) -> usize {
        let now_ms = Utc::now().timestamp_millis();
        let timeout = self.limits.idle_timeout;

        let mut sessions = self.sessions.write().await;
        let initial_count = sessions.len();
        sessions.retain(|_, session| !session.is_expired(now_ms, timeout));
        let removed = initial_count - sessions.len();

        if removed > 0 {
            info!("Cleaned up {} expired sessions", removed);
        }
        removed
    }

    /// Number of live sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
