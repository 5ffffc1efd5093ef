//! Inbound event model.
//!
//! Every arrival from the transport is exactly one [`InboundEvent`]:
//!
//! ```text
//! InboundEvent
//! ├── Message  { id, sender, chat, text }
//! ├── Callback { id, sender, message: Message, data }
//! └── Query    { id, sender, text }        (received, never routed)
//! ```
//!
//! Events are immutable once received; the dispatch core hands each one to
//! its own unit of work by value.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Identifier of a message within a chat.
pub type MessageId = i64;

/// A user on the messaging backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    pub first_name: String,
    #[serde(default)]
    pub username: Option<String>,
}

impl User {
    /// Creates a user with only the required fields.
    pub fn new(id: i64, first_name: impl Into<String>) -> Self {
        Self {
            id,
            is_bot: false,
            first_name: first_name.into(),
            username: None,
        }
    }

    /// Sets the username (without the leading `@`).
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }
}

/// Kind of chat a message belongs to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatKind {
    #[default]
    Private,
    Group,
    Supergroup,
    Channel,
}

/// A chat (private conversation, group, or channel).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    pub id: i64,
    #[serde(default, rename = "type")]
    pub kind: ChatKind,
    #[serde(default)]
    pub title: Option<String>,
}

impl Chat {
    /// Creates a private chat.
    pub fn private(id: i64) -> Self {
        Self {
            id,
            kind: ChatKind::Private,
            title: None,
        }
    }

    /// Creates a group chat with a title.
    pub fn group(id: i64, title: impl Into<String>) -> Self {
        Self {
            id,
            kind: ChatKind::Group,
            title: Some(title.into()),
        }
    }
}

/// A text message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub sender: User,
    pub chat: Chat,
    #[serde(default)]
    pub text: String,
}

impl Message {
    pub fn new(id: MessageId, sender: User, chat: Chat, text: impl Into<String>) -> Self {
        Self {
            id,
            sender,
            chat,
            text: text.into(),
        }
    }
}

/// A button-press callback.
///
/// A callback always carries the message the button was attached to; the
/// chat of a callback is that message's chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Callback {
    pub id: String,
    pub sender: User,
    pub message: Message,
    #[serde(default)]
    pub data: String,
}

impl Callback {
    pub fn new(
        id: impl Into<String>,
        sender: User,
        message: Message,
        data: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            sender,
            message,
            data: data.into(),
        }
    }

    /// Deserializes the button payload as JSON.
    pub fn parse_data<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_str(&self.data)
    }
}

/// An inline query. Received and acknowledged, not routed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub id: String,
    pub sender: User,
    #[serde(default)]
    pub text: String,
}

/// One arrival from the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InboundEvent {
    Message(Message),
    Callback(Callback),
    Query(Query),
}

impl InboundEvent {
    /// Short name of the event kind, used as a log field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Message(_) => "message",
            Self::Callback(_) => "callback",
            Self::Query(_) => "query",
        }
    }

    /// The event's own identifier rendered as a string.
    pub fn id(&self) -> String {
        match self {
            Self::Message(m) => m.id.to_string(),
            Self::Callback(c) => c.id.clone(),
            Self::Query(q) => q.id.clone(),
        }
    }

    /// The user who triggered the event.
    pub fn sender(&self) -> &User {
        match self {
            Self::Message(m) => &m.sender,
            Self::Callback(c) => &c.sender,
            Self::Query(q) => &q.sender,
        }
    }
}

impl From<Message> for InboundEvent {
    fn from(message: Message) -> Self {
        Self::Message(message)
    }
}

impl From<Callback> for InboundEvent {
    fn from(callback: Callback) -> Self {
        Self::Callback(callback)
    }
}

impl From<Query> for InboundEvent {
    fn from(query: Query) -> Self {
        Self::Query(query)
    }
}
