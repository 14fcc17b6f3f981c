// Message Domain Model

use crate::domain::error::{DomainError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Message ID (queue-scoped, monotonically increasing)
pub type MessageId = i64;

/// Message payload
///
/// Opaque text. The engine never looks inside beyond the optional
/// well-formedness check applied at enqueue time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessagePayload(String);

impl MessagePayload {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// Serialize a value into a JSON payload
    pub fn from_json<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<Self> {
        serde_json::to_string(value).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decode the payload as JSON into `T`
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.0).map_err(|e| DomainError::InvalidPayload(e.to_string()))
    }
}

impl From<String> for MessagePayload {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for MessagePayload {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Message as seen by consumers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    /// Number of successful dequeues, including the one that produced this value
    pub read_count: i64,
    pub enqueued_at: i64, // epoch ms
    /// Instant before which the message is hidden from dequeues (epoch ms)
    pub visible_at: i64,
    pub payload: MessagePayload,
}

impl Message {
    /// Visible to dequeue iff `now >= visible_at`
    pub fn is_visible_at(&self, now_millis: i64) -> bool {
        now_millis >= self.visible_at
    }

    pub fn enqueued_at_utc(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        chrono::DateTime::from_timestamp_millis(self.enqueued_at)
    }

    pub fn visible_at_utc(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        chrono::DateTime::from_timestamp_millis(self.visible_at)
    }
}

/// Terminal snapshot of an archived message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchivedMessage {
    #[serde(flatten)]
    pub message: Message,
    pub archived_at: i64, // epoch ms
}

/// Messages to insert in one atomic operation
///
/// Every message in a batch shares the same enqueue instant and visibility
/// instant.
#[derive(Debug, Clone)]
pub struct NewMessageBatch {
    pub enqueued_at: i64,
    pub visible_at: i64,
    pub payloads: Vec<MessagePayload>,
}

impl NewMessageBatch {
    pub fn len(&self) -> usize {
        self.payloads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payloads.is_empty()
    }
}
