//! Conversation domain types.
//!
//! A conversation is an ordered list of role-tagged entries. The first entry
//! of every prompt is the seed system entry describing the command grammar.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The role of an entry in the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions and world context
    System,
    /// The operator talking through chat
    User,
    /// The model's reply
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single entry in the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationEntry {
    /// Who produced this entry
    pub role: Role,

    /// The text content
    pub content: String,

    /// When the entry was created (never sent on the wire)
    #[serde(skip, default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl ConversationEntry {
    fn with_role(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create a new system entry.
    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(Role::System, content)
    }

    /// Create a new user entry.
    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(Role::User, content)
    }

    /// Create a new assistant entry.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(Role::Assistant, content)
    }
}
