//! Message store: the authoritative record of every conversation turn.
//!
//! Turn runners write into it while a model responds. The stream coordinator
//! subscribes to its change events for live chunks and reads it back with
//! [`MessageStore::list`] once a turn is committed.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Identifies one conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifies one message within the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(Uuid);

impl MessageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub session_id: SessionId,
    pub role: Role,
    pub content: String,
    /// False while the model is still writing into it
    pub finished: bool,
}

/// Change notification published to subscribers.
///
/// A growing message is redelivered in full on every update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageEvent {
    Upserted(Message),
    RolledBack { session_id: SessionId, len: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("Unknown session: {0}")]
    UnknownSession(SessionId),
    #[error("Unknown message: {0}")]
    UnknownMessage(MessageId),
    #[error("Message store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Subscribe to change events for every session
    fn subscribe(&self) -> broadcast::Receiver<MessageEvent>;

    /// Committed messages of a session, oldest first
    async fn list(&self, session_id: SessionId) -> Result<Vec<Message>, StoreError>;

    /// Append a message to a session, creating the session if needed
    async fn append(
        &self,
        session_id: SessionId,
        role: Role,
        content: String,
        finished: bool,
    ) -> Result<Message, StoreError>;

    /// Replace the content of an existing message
    async fn update(
        &self,
        session_id: SessionId,
        id: MessageId,
        content: String,
        finished: bool,
    ) -> Result<Message, StoreError>;

    /// Truncate a session to its first `len` messages
    async fn rollback(&self, session_id: SessionId, len: usize) -> Result<(), StoreError>;
}

const EVENT_CAPACITY: usize = 256;

/// Process-local store backed by a map of sessions
pub struct MemoryStore {
    sessions: Mutex<HashMap<SessionId, Vec<Message>>>,
    events: broadcast::Sender<MessageEvent>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            sessions: Mutex::new(HashMap::new()),
            events,
        }
    }

    fn publish(&self, event: MessageEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    fn subscribe(&self) -> broadcast::Receiver<MessageEvent> {
        self.events.subscribe()
    }

    async fn list(&self, session_id: SessionId) -> Result<Vec<Message>, StoreError> {
        Ok(self
            .sessions
            .lock()
            .get(&session_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn append(
        &self,
        session_id: SessionId,
        role: Role,
        content: String,
        finished: bool,
    ) -> Result<Message, StoreError> {
        let message = Message {
            id: MessageId::new(),
            session_id,
            role,
            content,
            finished,
        };
        self.sessions
            .lock()
            .entry(session_id)
            .or_default()
            .push(message.clone());
        self.publish(MessageEvent::Upserted(message.clone()));
        Ok(message)
    }

    async fn update(
        &self,
        session_id: SessionId,
        id: MessageId,
        content: String,
        finished: bool,
    ) -> Result<Message, StoreError> {
        let updated = {
            let mut sessions = self.sessions.lock();
            let messages = sessions
                .get_mut(&session_id)
                .ok_or(StoreError::UnknownSession(session_id))?;
            let message = messages
                .iter_mut()
                .find(|m| m.id == id)
                .ok_or(StoreError::UnknownMessage(id))?;
            message.content = content;
            message.finished = finished;
            message.clone()
        };
        self.publish(MessageEvent::Upserted(updated.clone()));
        Ok(updated)
    }

    async fn rollback(&self, session_id: SessionId, len: usize) -> Result<(), StoreError> {
        if let Some(messages) = self.sessions.lock().get_mut(&session_id) {
            messages.truncate(len);
        }
        self.publish(MessageEvent::RolledBack { session_id, len });
        Ok(())
    }
}
