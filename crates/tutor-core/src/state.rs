//! UI-agnostic conversation state types
//!
//! These are shared between the store, the completion gateway and whatever
//! frontend renders the transcript. None of them depend on a UI framework.

use serde::{Deserialize, Serialize};

/// A chat message in the tutoring conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }
}

/// Everything a frontend needs to draw the conversation at one instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationState {
    pub history: Vec<ChatMessage>,
    pub pending: bool,
}

/// What happens to a reply that settles after the conversation was reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StaleReplyPolicy {
    /// Append it to whatever history exists when it arrives.
    #[default]
    Append,
    /// Drop it; only the pending flag is cleared.
    Discard,
}
