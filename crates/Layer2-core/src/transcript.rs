//! Run transcript
//!
//! Ordered record of what was said during a run. Conditions see a window of
//! the most recent messages; the caller receives the whole thing at the end.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who produced a transcript message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    /// The initial message handed to the run
    User,
    /// An agent's conversational output
    Agent,
    /// The message returned by a function call
    Function,
}

/// One transcript entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    /// Agent name, function name, or "user"
    pub sender: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(role: MessageRole, sender: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role,
            sender: sender.into(),
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, "user", content)
    }

    pub fn agent(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(MessageRole::Agent, name, content)
    }

    pub fn function(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(MessageRole::Function, name, content)
    }
}

/// Message history for a run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn add_user(&mut self, content: impl Into<String>) {
        self.push(Message::user(content));
    }

    pub fn add_agent(&mut self, name: impl Into<String>, content: impl Into<String>) {
        self.push(Message::agent(name, content));
    }

    pub fn add_function(&mut self, name: impl Into<String>, content: impl Into<String>) {
        self.push(Message::function(name, content));
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// The last `n` messages (all of them if fewer)
    pub fn recent(&self, n: usize) -> &[Message] {
        let start = self.messages.len().saturating_sub(n);
        &self.messages[start..]
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Most recent message sent by `sender`
    pub fn last_from(&self, sender: &str) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.sender == sender)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
