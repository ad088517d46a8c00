//! UI-agnostic conversation state
//!
//! Messages and the bounded history window a session keeps. Nothing here
//! knows how a message is rendered.

use chrono::Local;
use serde::{Deserialize, Serialize};

/// A single chat turn as shown to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub text: String,
    pub sender: Sender,
    /// Local wall-clock time, e.g. `3:07 PM`
    pub timestamp: String,
}

/// Who sent a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

impl Sender {
    /// Role name used by chat-completion APIs.
    pub fn role(&self) -> &'static str {
        match self {
            Sender::User => "user",
            Sender::Bot => "assistant",
        }
    }
}

impl Message {
    pub fn new(text: impl Into<String>, sender: Sender) -> Self {
        Self {
            text: text.into(),
            sender,
            timestamp: Local::now().format("%-I:%M %p").to_string(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(text, Sender::User)
    }

    pub fn bot(text: impl Into<String>) -> Self {
        Self::new(text, Sender::Bot)
    }
}

/// Append-only message log that keeps only the newest `capacity` entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct History {
    messages: Vec<Message>,
    capacity: usize,
}

impl History {
    pub fn new(capacity: usize) -> Self {
        Self {
            messages: Vec::new(),
            capacity,
        }
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
        if self.messages.len() > self.capacity {
            let excess = self.messages.len() - self.capacity;
            self.messages.drain(..excess);
        }
    }

    /// The last `n` messages, oldest first.
    pub fn recent(&self, n: usize) -> &[Message] {
        let start = self.messages.len().saturating_sub(n);
        &self.messages[start..]
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_drops_oldest_beyond_capacity() {
        let mut history = History::new(3);
        for i in 0..5 {
            history.push(Message::user(format!("m{}", i)));
        }
        let texts: Vec<&str> = history.messages().iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["m2", "m3", "m4"]);
    }

    #[test]
    fn test_recent_returns_tail_in_order() {
        let mut history = History::new(50);
        history.push(Message::user("hi"));
        history.push(Message::bot("hello"));
        history.push(Message::user("hours?"));

        let recent = history.recent(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].sender, Sender::Bot);
        assert_eq!(recent[1].text, "hours?");
        assert_eq!(history.recent(10).len(), 3);
    }

    #[test]
    fn test_sender_serializes_lowercase() {
        let message = Message::bot("ok");
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["sender"], "bot");
        assert_eq!(Sender::Bot.role(), "assistant");
        assert_eq!(Sender::User.role(), "user");
    }
}
