// Domain Layer - Queue and message value types

pub mod error;
pub mod message;
pub mod queue;

// Re-exports
pub use error::DomainError;
pub use message::{ArchivedMessage, Message, MessageId, MessagePayload, NewMessageBatch};
pub use queue::{QueueInfo, QueueMetrics, QueueName, MAX_QUEUE_NAME_LEN};
