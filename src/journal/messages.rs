//! Follow-up conversation turns attached to an entry.

use super::{Reply, ReplyStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Who wrote a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            other => Err(format!("unknown message role: {}", other)),
        }
    }
}

/// Content of a turn.
///
/// Assistant turns carry a [`Reply`], so they degrade exactly like entry replies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageBody {
    User(String),
    Assistant(Reply),
}

impl MessageBody {
    pub fn role(&self) -> MessageRole {
        match self {
            MessageBody::User(_) => MessageRole::User,
            MessageBody::Assistant(_) => MessageRole::Assistant,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            MessageBody::User(text) => Some(text),
            MessageBody::Assistant(reply) => reply.text(),
        }
    }

    /// `None` for user turns.
    pub fn reply_status(&self) -> Option<ReplyStatus> {
        match self {
            MessageBody::User(_) => None,
            MessageBody::Assistant(reply) => Some(reply.status()),
        }
    }

    /// Rebuilds a body from its stored columns, or `None` if they disagree.
    pub fn from_parts(
        role: MessageRole,
        text: Option<String>,
        status: Option<ReplyStatus>,
    ) -> Option<MessageBody> {
        match (role, status) {
            (MessageRole::User, None) => text.filter(|t| !t.is_empty()).map(MessageBody::User),
            (MessageRole::Assistant, Some(status)) => {
                Reply::from_parts(status, text).map(MessageBody::Assistant)
            }
            _ => None,
        }
    }
}

/// A turn ready to be appended.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMessage {
    pub entry_id: i64,
    pub body: MessageBody,
    pub created_at: DateTime<Utc>,
}

/// A stored conversation turn.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryMessage {
    pub id: i64,
    pub entry_id: i64,
    pub body: MessageBody,
    pub created_at: DateTime<Utc>,
}

impl EntryMessage {
    pub fn from_new(id: i64, message: NewMessage) -> Self {
        Self {
            id,
            entry_id: message.entry_id,
            body: message.body,
            created_at: message.created_at,
        }
    }

    pub fn role(&self) -> MessageRole {
        self.body.role()
    }

    pub fn text(&self) -> Option<&str> {
        self.body.text()
    }
}

#[derive(Serialize)]
struct MessageView<'a> {
    id: i64,
    entry_id: i64,
    role: MessageRole,
    text: Option<&'a str>,
    reply_status: Option<ReplyStatus>,
    created_at: DateTime<Utc>,
}

impl Serialize for EntryMessage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        MessageView {
            id: self.id,
            entry_id: self.entry_id,
            role: self.role(),
            text: self.text(),
            reply_status: self.body.reply_status(),
            created_at: self.created_at,
        }
        .serialize(serializer)
    }
}
