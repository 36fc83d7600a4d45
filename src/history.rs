//! Conversation history — the ordered message list sent to the chat API.
//!
//! [`ConversationHistory`] only mutates through three commands:
//!
//! * [`append_user`](ConversationHistory::append_user) — stage the user turn.
//! * [`commit_assistant`](ConversationHistory::commit_assistant) — pair the
//!   staged user turn with the assistant reply.
//! * [`rollback_pending_user`](ConversationHistory::rollback_pending_user) —
//!   drop the staged user turn after a failed completion call.
//!
//! The pending flag guarantees the user/assistant pairing invariant: the
//! list never holds two consecutive user messages, and a user message whose
//! completion failed never stays behind in the context window.

use serde::Serialize;

// ---------------------------------------------------------------------------
// Role / Message
// ---------------------------------------------------------------------------

/// Author of a [`Message`]. Serialised lowercase, matching the
/// chat-completions wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One entry of the context window. Immutable once appended; ordering is
/// chronological and meaningful.
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// ConversationHistory
// ---------------------------------------------------------------------------

/// Ordered message list, optionally seeded with one system message.
///
/// Owned exclusively by the session; other components only see `&[Message]`
/// snapshots for the duration of a single call.
#[derive(Debug, Default)]
pub struct ConversationHistory {
    messages: Vec<Message>,
    pending_user: bool,
}

impl ConversationHistory {
    /// Create a history, seeded with `system_prompt` when one is configured.
    pub fn new(system_prompt: Option<&str>) -> Self {
        let mut messages = Vec::new();
        if let Some(prompt) = system_prompt {
            messages.push(Message::new(Role::System, prompt));
        }
        Self {
            messages,
            pending_user: false,
        }
    }

    /// Stage a user message. The message is part of the context immediately
    /// (the completion request must see it) but remains revocable until
    /// [`commit_assistant`](Self::commit_assistant) pairs it.
    ///
    /// Calling this twice without an intervening commit or rollback is a
    /// controller bug; the stale staged message is discarded so the pairing
    /// invariant holds regardless.
    pub fn append_user(&mut self, content: impl Into<String>) {
        if self.pending_user {
            debug_assert!(false, "append_user while a user message is pending");
            self.messages.pop();
        }
        self.messages.push(Message::new(Role::User, content));
        self.pending_user = true;
    }

    /// Record the assistant reply, sealing the staged user message.
    pub fn commit_assistant(&mut self, content: impl Into<String>) {
        self.messages.push(Message::new(Role::Assistant, content));
        self.pending_user = false;
    }

    /// Remove the staged user message after a failed completion call.
    ///
    /// Returns `true` when a message was removed. A no-op when nothing is
    /// pending, so callers can invoke it unconditionally on the error path.
    pub fn rollback_pending_user(&mut self) -> bool {
        if !self.pending_user {
            return false;
        }
        self.messages.pop();
        self.pending_user = false;
        true
    }

    /// Snapshot of the context window, in chronological order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeds_system_message() {
        let history = ConversationHistory::new(Some("be terse"));
        assert_eq!(history.len(), 1);
        assert_eq!(history.messages()[0].role, Role::System);
        assert_eq!(history.messages()[0].content, "be terse");
    }

    #[test]
    fn no_seed_without_prompt() {
        let history = ConversationHistory::new(None);
        assert!(history.is_empty());
    }

    #[test]
    fn commit_pairs_user_and_assistant() {
        let mut history = ConversationHistory::new(None);
        history.append_user("hello");
        history.commit_assistant("hi there");

        assert_eq!(history.len(), 2);
        assert_eq!(history.messages()[0].role, Role::User);
        assert_eq!(history.messages()[1].role, Role::Assistant);
    }

    /// Rollback property: a failed completion leaves the history exactly as
    /// it was before the turn started.
    #[test]
    fn rollback_restores_previous_length() {
        let mut history = ConversationHistory::new(Some("sys"));
        history.append_user("first");
        history.commit_assistant("reply");
        let before = history.len();

        history.append_user("second");
        assert_eq!(history.len(), before + 1);

        assert!(history.rollback_pending_user());
        assert_eq!(history.len(), before);
        assert_eq!(history.messages().last().unwrap().role, Role::Assistant);
    }

    #[test]
    fn rollback_without_pending_is_noop() {
        let mut history = ConversationHistory::new(None);
        assert!(!history.rollback_pending_user());

        history.append_user("q");
        history.commit_assistant("a");
        assert!(!history.rollback_pending_user());
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn roles_serialise_lowercase() {
        let message = Message::new(Role::Assistant, "ok");
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["role"], "assistant");
        assert_eq!(json["content"], "ok");
    }
}
