// ABOUTME: Transcript types for one agent run's conversation with the model.
// ABOUTME: Append-only message history plus the parsed tool-call shape extracted from replies.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The speaker of a transcript message, matching chat-completion roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    Assistant,
    User,
}

/// A single role/content message. Tool results are fed back to the model
/// as `user` messages, so the whole exchange is representable here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// The ordered message history for one agent run. Exclusively owned by its
/// run: created at run start, grows monotonically, discarded at run end.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a transcript from a seed system message.
    pub fn seeded(seed: Message) -> Self {
        Self {
            messages: vec![seed],
        }
    }

    /// Append a message. There is deliberately no way to remove or reorder.
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// A tool call parsed from one assistant reply. Transient: it exists only
/// within a single turn. `arguments` are positional, ordered to match the
/// registry's parameter list for the named function.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub function_name: String,
    pub arguments: Vec<Value>,
    pub reasoning: String,
}
