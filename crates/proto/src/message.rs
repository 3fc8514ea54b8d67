use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Message role in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Message authored by an end user.
    User,
    /// Message authored by the assistant.
    Assistant,
    /// System-level instruction message.
    System,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
            Role::System => write!(f, "system"),
        }
    }
}

/// A role-tagged message as exchanged with the chat endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Semantic role of this message.
    pub role: Role,
    /// Message text.
    #[serde(default)]
    pub content: String,
}

impl ChatMessage {
    /// Creates a user-role message with the given content.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Creates an assistant-role message with the given content.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Body of one chat turn request.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    /// Target model name.
    pub model: String,
    /// Full conversation so far, oldest first.
    pub messages: Vec<ChatMessage>,
}

/// One line of the streamed chat response.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamEvent {
    /// Partial assistant message carried by this line.
    pub message: ChatMessage,
    /// Server timestamp for this fragment.
    pub created_at: DateTime<Utc>,
    /// Set on the final line of a response.
    #[serde(default)]
    pub done: bool,
}

/// Error object returned by the server, either as a whole body or as a stream line.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorPayload {
    pub error: String,
}
