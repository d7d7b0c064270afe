//! Shared types for the Parley voice relay.
//!
//! This crate provides the foundational types used across all Parley crates:
//! conversation roles and messages (serialized in the OpenAI chat format),
//! voice profiles, and the WebSocket wire events exchanged with the browser
//! client.

use serde::{Deserialize, Serialize};

pub mod events;
pub mod voice;

pub use events::{IncomingEvent, OutgoingEvent, SEARCH_STARTED_MESSAGE};
pub use voice::VoiceProfile;

/// Author of a conversation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions that frame the whole conversation.
    System,
    /// Transcribed speech from the connected client.
    User,
    /// Replies produced by an answer engine.
    Assistant,
}

impl Role {
    /// Returns the wire label for this role.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One entry of a conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
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

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}
