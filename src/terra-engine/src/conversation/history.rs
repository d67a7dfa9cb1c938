//! Conversation history.

use crate::message::Message;

/// Default upper bound on retained messages, system message included.
pub const DEFAULT_MAX_MESSAGES: usize = 7;

/// Bounds applied to a history after every completed exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryLimits {
    max_messages: usize,
}

impl HistoryLimits {
    /// Create limits keeping at most `max_messages` entries.
    ///
    /// Values below 2 are raised to 2 so the system message always has
    /// company.
    pub fn new(max_messages: usize) -> Self {
        Self {
            max_messages: max_messages.max(2),
        }
    }

    pub fn max_messages(&self) -> usize {
        self.max_messages
    }

    /// Number of most recent messages kept behind the system message.
    pub fn retained_recent(&self) -> usize {
        self.max_messages - 1
    }
}

impl Default for HistoryLimits {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_MESSAGES)
    }
}

/// Ordered conversation history anchored by a system message.
///
/// Index 0 always holds the system message; truncation never evicts it.
#[derive(Debug, Clone)]
pub struct ConversationHistory {
    messages: Vec<Message>,
}

impl ConversationHistory {
    /// Create a history holding only the system message.
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::system(system_prompt)],
        }
    }

    /// Append a message to the tail.
    pub fn add_message(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Commit a completed user/assistant pair, then truncate.
    pub fn commit_exchange(&mut self, user: Message, assistant: Message, limits: HistoryLimits) {
        self.messages.push(user);
        self.messages.push(assistant);
        self.truncate(limits);
    }

    /// Keep the system message plus the most recent entries once the history
    /// grows beyond `limits.max_messages()`.
    pub fn truncate(&mut self, limits: HistoryLimits) {
        let len = self.messages.len();
        if len <= limits.max_messages() {
            return;
        }
        let first_kept = len - limits.retained_recent();
        self.messages.drain(1..first_kept);
    }

    /// Get all messages.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Get the system message.
    pub fn system_message(&self) -> &Message {
        &self.messages[0]
    }

    /// Get message count.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Always false; a history is never without its system message.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn exchange(history: &mut ConversationHistory, n: usize) {
        history.commit_exchange(
            Message::user(format!("q{n}")),
            Message::assistant(format!("a{n}")),
            HistoryLimits::default(),
        );
    }

    #[test]
    fn test_new_history_has_system_message() {
        let history = ConversationHistory::new("be green");
        assert_eq!(history.len(), 1);
        assert_eq!(history.system_message(), &Message::system("be green"));
        assert!(!history.is_empty());
    }

    #[test]
    fn test_no_truncation_at_limit() {
        let mut history = ConversationHistory::new("sys");
        for n in 1..=3 {
            exchange(&mut history, n);
        }
        assert_eq!(history.len(), 7);
    }

    #[test]
    fn test_truncation_keeps_system_and_last_six() {
        let mut history = ConversationHistory::new("sys");
        for n in 1..=8 {
            exchange(&mut history, n);
        }

        let expected = vec![
            Message::system("sys"),
            Message::user("q6"),
            Message::assistant("a6"),
            Message::user("q7"),
            Message::assistant("a7"),
            Message::user("q8"),
            Message::assistant("a8"),
        ];
        assert_eq!(history.messages(), expected.as_slice());
    }

    #[test]
    fn test_truncation_after_every_exchange_stays_bounded() {
        let mut history = ConversationHistory::new("sys");
        for n in 1..=50 {
            exchange(&mut history, n);
            assert!(history.len() <= 7);
            assert_eq!(history.system_message(), &Message::system("sys"));
        }
        assert_eq!(history.len(), 7);
    }

    #[test]
    fn test_truncate_single_overflow() {
        let mut history = ConversationHistory::new("sys");
        for n in 0..7 {
            history.add_message(Message::user(format!("m{n}")));
        }
        assert_eq!(history.len(), 8);

        history.truncate(HistoryLimits::default());
        assert_eq!(history.len(), 7);
        assert_eq!(history.messages()[1], Message::user("m1"));
        assert_eq!(history.messages()[6], Message::user("m6"));
    }

    #[test]
    fn test_custom_limits() {
        let limits = HistoryLimits::new(3);
        assert_eq!(limits.retained_recent(), 2);

        let mut history = ConversationHistory::new("sys");
        history.commit_exchange(Message::user("q1"), Message::assistant("a1"), limits);
        history.commit_exchange(Message::user("q2"), Message::assistant("a2"), limits);
        assert_eq!(history.len(), 3);
        assert_eq!(history.messages()[1], Message::user("q2"));
    }

    #[test]
    fn test_limits_floor() {
        assert_eq!(HistoryLimits::new(0).max_messages(), 2);
        assert_eq!(HistoryLimits::new(1).retained_recent(), 1);
    }
}
