//! Domain entities: connections, sessions and the messages they accumulate.

use super::value_object::{ClientId, MessageId, Timestamp};

/// Verified identity of the user behind a connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub username: String,
}

impl Identity {
    pub fn new(user_id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            username: username.into(),
        }
    }
}

/// A live, authenticated connection.
///
/// The socket itself is owned by the UI layer; the registry keeps the channel
/// feeding it next to this metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub id: ClientId,
    pub identity: Identity,
    pub connected_at: Timestamp,
    pub last_activity: Timestamp,
}

impl Connection {
    pub fn new(id: ClientId, identity: Identity, connected_at: Timestamp) -> Self {
        Self {
            id,
            identity,
            connected_at,
            last_activity: connected_at,
        }
    }

    /// Record inbound activity (a frame or a transport pong)
    pub fn touch(&mut self, at: Timestamp) {
        if at > self.last_activity {
            self.last_activity = at;
        }
    }
}

/// Who authored a message in a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    User,
    Assistant,
    System,
}

/// One entry of a session's conversation history
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub kind: MessageKind,
    pub content: String,
    pub timestamp: Timestamp,
    pub message_id: Option<MessageId>,
}

impl Message {
    pub fn user(content: impl Into<String>, message_id: Option<MessageId>) -> Self {
        Self::new(MessageKind::User, content, message_id)
    }

    pub fn assistant(content: impl Into<String>, message_id: MessageId) -> Self {
        Self::new(MessageKind::Assistant, content, Some(message_id))
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageKind::System, content, None)
    }

    fn new(kind: MessageKind, content: impl Into<String>, message_id: Option<MessageId>) -> Self {
        Self {
            kind,
            content: content.into(),
            timestamp: Timestamp::now(),
            message_id,
        }
    }
}

/// Conversation state tied to one connection's identity.
///
/// History is append-only: entries are never edited or removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
    pub username: String,
    pub created_at: Timestamp,
    messages: Vec<Message>,
}

impl Session {
    pub fn new(identity: &Identity, created_at: Timestamp) -> Self {
        Self {
            user_id: identity.user_id.clone(),
            username: identity.username.clone(),
            created_at,
            messages: Vec::new(),
        }
    }

    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// User and assistant turns that belong to a correlated exchange, oldest first
    pub fn conversation_history(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter().filter(|m| {
            m.message_id.is_some() && matches!(m.kind, MessageKind::User | MessageKind::Assistant)
        })
    }
}
