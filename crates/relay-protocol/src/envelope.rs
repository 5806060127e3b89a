//! Wire envelope shared by both directions of the chat protocol.
//!
//! ```text
//! {"type":"join","username":"alice"}
//! {"type":"message","content":"hi"}
//! {"type":"user-joined","username":"alice","content":"alice joined the chat","timestamp":"..."}
//! {"type":"user-left","username":"alice","content":"alice left the chat","timestamp":"..."}
//! {"type":"users-list","users":["alice","bob"]}
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single chat protocol message, discriminated by its `type` field.
///
/// Field names are camelCase and absent optional fields are omitted from the
/// encoded form rather than written as `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum Envelope {
    /// Client announces its display name.
    Join { username: String },

    /// A chat line. Inbound, only `content` matters: the relay stamps the
    /// sender's registered name and its own clock before fanning it out.
    Message {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        username: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<DateTime<Utc>>,
    },

    UserJoined {
        username: String,
        content: String,
        timestamp: DateTime<Utc>,
    },

    UserLeft {
        username: String,
        content: String,
        timestamp: DateTime<Utc>,
    },

    /// Current roster of distinct display names.
    UsersList { users: Vec<String> },

    /// Any `type` value this relay does not understand.
    #[serde(other)]
    Unknown,
}

/// Envelope discriminant without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnvelopeKind {
    Join,
    Message,
    UserJoined,
    UserLeft,
    UsersList,
    Unknown,
}

impl EnvelopeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Join => "join",
            Self::Message => "message",
            Self::UserJoined => "user-joined",
            Self::UserLeft => "user-left",
            Self::UsersList => "users-list",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for EnvelopeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Envelope {
    pub fn kind(&self) -> EnvelopeKind {
        match self {
            Self::Join { .. } => EnvelopeKind::Join,
            Self::Message { .. } => EnvelopeKind::Message,
            Self::UserJoined { .. } => EnvelopeKind::UserJoined,
            Self::UserLeft { .. } => EnvelopeKind::UserLeft,
            Self::UsersList { .. } => EnvelopeKind::UsersList,
            Self::Unknown => EnvelopeKind::Unknown,
        }
    }

    /// Outbound chat line attributed to `username`.
    pub fn chat_message(
        username: impl Into<String>,
        content: Option<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self::Message {
            username: Some(username.into()),
            content,
            timestamp: Some(timestamp),
        }
    }

    pub fn user_joined(username: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        let username = username.into();
        Self::UserJoined {
            content: format!("{username} joined the chat"),
            username,
            timestamp,
        }
    }

    pub fn user_left(username: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        let username = username.into();
        Self::UserLeft {
            content: format!("{username} left the chat"),
            username,
            timestamp,
        }
    }

    pub fn users_list(users: Vec<String>) -> Self {
        Self::UsersList { users }
    }
}
