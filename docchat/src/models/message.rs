//! Message model representing one turn in a document conversation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role of a message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Message from the user.
    User,
    /// Message from the assistant.
    Assistant,
}

impl MessageRole {
    /// Convert role to the wire string.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A message in the transcript of the active session.
///
/// Assistant content may embed lightweight line markers (bold, bullet,
/// numbered); those are plain text here and only interpreted at render time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Client-assigned identifier (`UUIDv7`, time-ordered).
    pub id: Uuid,
    /// Role of the message sender.
    pub role: MessageRole,
    /// Content of the message.
    pub content: String,
    /// Pages the backend cited as evidence. Always empty for user messages.
    #[serde(default)]
    pub source_pages: Vec<u32>,
    /// When the message was appended.
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            role: MessageRole::User,
            content: content.into(),
            source_pages: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Create an assistant message with its cited pages.
    pub fn assistant(content: impl Into<String>, source_pages: Vec<u32>) -> Self {
        Self {
            id: Uuid::now_v7(),
            role: MessageRole::Assistant,
            content: content.into(),
            source_pages,
            created_at: Utc::now(),
        }
    }
}
