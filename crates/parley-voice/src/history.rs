//! Bounded conversation history.

use parley_types::{Message, Role};

/// Maximum history length, system message included.
pub const MAX_HISTORY_LEN: usize = 11;

/// Messages kept after the system message when the cap is exceeded.
pub const RETAINED_MESSAGES: usize = MAX_HISTORY_LEN - 1;

/// Ordered messages of one conversation. The first element is always the
/// system message; the length is capped after each assistant reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationHistory {
    messages: Vec<Message>,
}

impl ConversationHistory {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::system(system_prompt)],
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Never true: the system message is always present.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn system(&self) -> &Message {
        &self.messages[0]
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.messages.push(Message::user(content));
    }

    /// Removes the trailing user message, if the history ends with one.
    pub fn pop_user(&mut self) -> Option<Message> {
        if self.messages.len() > 1 && self.messages.last().map(|m| m.role) == Some(Role::User) {
            self.messages.pop()
        } else {
            None
        }
    }

    /// Appends a reply, then trims to `[system] + last RETAINED_MESSAGES`.
    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.messages.push(Message::assistant(content));
        self.enforce_cap();
    }

    fn enforce_cap(&mut self) {
        if self.messages.len() > MAX_HISTORY_LEN {
            let excess = self.messages.len() - MAX_HISTORY_LEN;
            self.messages.drain(1..=excess);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_with_only_the_system_message() {
        let history = ConversationHistory::new("be brief");
        assert_eq!(history.len(), 1);
        assert_eq!(history.system(), &Message::system("be brief"));
    }

    #[test]
    fn cap_keeps_system_and_most_recent() {
        let mut history = ConversationHistory::new("sys");
        for i in 0..12 {
            history.push_user(format!("q{}", i));
            history.push_assistant(format!("a{}", i));
            assert!(history.len() <= MAX_HISTORY_LEN);
            assert_eq!(history.messages()[0].role, Role::System);
        }
        assert_eq!(history.len(), 11);
        let tail: Vec<&str> = history.messages()[1..]
            .iter()
            .map(|m| m.content.as_str())
            .collect();
        assert_eq!(
            tail,
            ["q7", "a7", "q8", "a8", "q9", "a9", "q10", "a10", "q11", "a11"]
        );
    }

    #[test]
    fn pop_user_only_removes_a_trailing_user_message() {
        let mut history = ConversationHistory::new("sys");
        assert_eq!(history.pop_user(), None);

        history.push_user("hello");
        assert_eq!(history.pop_user(), Some(Message::user("hello")));
        assert_eq!(history.len(), 1);

        history.push_user("hello");
        history.push_assistant("hi");
        assert_eq!(history.pop_user(), None);
        assert_eq!(history.len(), 3);
    }
}
