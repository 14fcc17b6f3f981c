// Message Store Port (Interface)

use crate::domain::{
    ArchivedMessage, Message, MessageId, NewMessageBatch, QueueInfo, QueueMetrics, QueueName,
};
use crate::error::Result;
use async_trait::async_trait;

/// Durable per-queue message storage
///
/// Every method is atomic on its own: implementations run each call as a
/// single statement or a single transaction. Operations on a queue that was
/// never provisioned fail with `AppError::QueueNotFound`.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Provision message and archive storage for `queue` (idempotent)
    ///
    /// Returns true if the queue did not exist before.
    async fn create_queue(&self, queue: &QueueName, now_millis: i64) -> Result<bool>;

    /// Irreversibly delete both tables of `queue`
    async fn drop_queue(&self, queue: &QueueName) -> Result<()>;

    /// All provisioned queues, ordered by name
    async fn list_queues(&self) -> Result<Vec<QueueInfo>>;

    /// Insert all messages of `batch` atomically
    ///
    /// Returns the assigned ids in the order of `batch.payloads`.
    async fn insert_batch(&self, queue: &QueueName, batch: &NewMessageBatch)
        -> Result<Vec<MessageId>>;

    /// Lease up to `quantity` messages visible at `now_millis`
    ///
    /// Selected messages are picked oldest id first, get `visible_at =
    /// visible_until` and a read counter incremented by one, within the same
    /// atomic step that produces the result.
    async fn read_and_lease(
        &self,
        queue: &QueueName,
        now_millis: i64,
        visible_until: i64,
        quantity: i64,
    ) -> Result<Vec<Message>>;

    /// Remove and return the oldest message visible at `now_millis`
    async fn pop(&self, queue: &QueueName, now_millis: i64) -> Result<Option<Message>>;

    /// Overwrite the visibility instant of one message
    async fn set_visible_at(
        &self,
        queue: &QueueName,
        id: MessageId,
        visible_at: i64,
    ) -> Result<Option<Message>>;

    /// Delete messages by id; returns the ids actually removed (any order, no duplicates)
    async fn delete_messages(&self, queue: &QueueName, ids: &[MessageId])
        -> Result<Vec<MessageId>>;

    /// Move messages into the archive; returns the ids actually moved (any order, no duplicates)
    async fn archive_messages(
        &self,
        queue: &QueueName,
        ids: &[MessageId],
        archived_at: i64,
    ) -> Result<Vec<MessageId>>;

    /// Archived messages ordered by id, at most `limit`
    async fn list_archived(&self, queue: &QueueName, limit: i64) -> Result<Vec<ArchivedMessage>>;

    /// Statistics snapshot
    async fn metrics(&self, queue: &QueueName, now_millis: i64) -> Result<QueueMetrics>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::error::AppError;
    use std::collections::{BTreeMap, BTreeSet};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Mutex, MutexGuard};

    #[derive(Default)]
    struct MemoryQueue {
        created_at: i64,
        last_id: MessageId,
        messages: BTreeMap<MessageId, Message>,
        archive: BTreeMap<MessageId, ArchivedMessage>,
    }

    /// In-memory MessageStore with a call counter
    ///
    /// A single mutex plays the role of the store's transaction isolation.
    #[derive(Default)]
    pub struct InMemoryMessageStore {
        queues: Mutex<BTreeMap<QueueName, MemoryQueue>>,
        calls: AtomicUsize,
    }

    impl InMemoryMessageStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Number of store calls made so far
        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        /// Count a call and take the store lock
        fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<QueueName, MemoryQueue>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.queues
                .lock()
                .map_err(|_| AppError::storage_invariant("in-memory store lock poisoned"))
        }

        fn with_queue<T>(
            &self,
            queue: &QueueName,
            f: impl FnOnce(&mut MemoryQueue) -> T,
        ) -> Result<T> {
            let mut queues = self.lock()?;
            let q = queues
                .get_mut(queue)
                .ok_or_else(|| AppError::QueueNotFound(queue.to_string()))?;
            Ok(f(q))
        }
    }

    #[async_trait]
    impl MessageStore for InMemoryMessageStore {
        async fn create_queue(&self, queue: &QueueName, now_millis: i64) -> Result<bool> {
            let mut queues = self.lock()?;
            if queues.contains_key(queue) {
                return Ok(false);
            }
            queues.insert(
                queue.clone(),
                MemoryQueue {
                    created_at: now_millis,
                    ..Default::default()
                },
            );
            Ok(true)
        }

        async fn drop_queue(&self, queue: &QueueName) -> Result<()> {
            self.lock()?
                .remove(queue)
                .map(|_| ())
                .ok_or_else(|| AppError::QueueNotFound(queue.to_string()))
        }

        async fn list_queues(&self) -> Result<Vec<QueueInfo>> {
            Ok(self
                .lock()?
                .iter()
                .map(|(name, q)| QueueInfo {
                    name: name.clone(),
                    created_at: q.created_at,
                })
                .collect())
        }

        async fn insert_batch(
            &self,
            queue: &QueueName,
            batch: &NewMessageBatch,
        ) -> Result<Vec<MessageId>> {
            self.with_queue(queue, |q| {
                batch
                    .payloads
                    .iter()
                    .map(|payload| {
                        q.last_id += 1;
                        q.messages.insert(
                            q.last_id,
                            Message {
                                id: q.last_id,
                                read_count: 0,
                                enqueued_at: batch.enqueued_at,
                                visible_at: batch.visible_at,
                                payload: payload.clone(),
                            },
                        );
                        q.last_id
                    })
                    .collect()
            })
        }

        async fn read_and_lease(
            &self,
            queue: &QueueName,
            now_millis: i64,
            visible_until: i64,
            quantity: i64,
        ) -> Result<Vec<Message>> {
            self.with_queue(queue, |q| {
                q.messages
                    .values_mut()
                    .filter(|m| m.is_visible_at(now_millis))
                    .take(quantity.max(0) as usize)
                    .map(|m| {
                        m.visible_at = visible_until;
                        m.read_count = m.read_count.saturating_add(1);
                        m.clone()
                    })
                    .collect()
            })
        }

        async fn pop(&self, queue: &QueueName, now_millis: i64) -> Result<Option<Message>> {
            self.with_queue(queue, |q| {
                let id = q
                    .messages
                    .values()
                    .find(|m| m.is_visible_at(now_millis))
                    .map(|m| m.id)?;
                q.messages.remove(&id)
            })
        }

        async fn set_visible_at(
            &self,
            queue: &QueueName,
            id: MessageId,
            visible_at: i64,
        ) -> Result<Option<Message>> {
            self.with_queue(queue, |q| {
                q.messages.get_mut(&id).map(|m| {
                    m.visible_at = visible_at;
                    m.clone()
                })
            })
        }

        async fn delete_messages(
            &self,
            queue: &QueueName,
            ids: &[MessageId],
        ) -> Result<Vec<MessageId>> {
            self.with_queue(queue, |q| {
                let unique: BTreeSet<_> = ids.iter().copied().collect();
                unique
                    .into_iter()
                    .filter(|id| q.messages.remove(id).is_some())
                    .collect()
            })
        }

        async fn archive_messages(
            &self,
            queue: &QueueName,
            ids: &[MessageId],
            archived_at: i64,
        ) -> Result<Vec<MessageId>> {
            self.with_queue(queue, |q| {
                let unique: BTreeSet<_> = ids.iter().copied().collect();
                let mut moved = Vec::new();
                for id in unique {
                    if let Some(message) = q.messages.remove(&id) {
                        q.archive.insert(
                            id,
                            ArchivedMessage {
                                message,
                                archived_at,
                            },
                        );
                        moved.push(id);
                    }
                }
                moved
            })
        }

        async fn list_archived(
            &self,
            queue: &QueueName,
            limit: i64,
        ) -> Result<Vec<ArchivedMessage>> {
            self.with_queue(queue, |q| {
                q.archive
                    .values()
                    .take(limit.max(0) as usize)
                    .cloned()
                    .collect()
            })
        }

        async fn metrics(&self, queue: &QueueName, now_millis: i64) -> Result<QueueMetrics> {
            self.with_queue(queue, |q| {
                let age = |t: i64| (now_millis - t) / 1000;
                QueueMetrics {
                    queue_name: queue.clone(),
                    queue_length: q.messages.len() as i64,
                    visible_length: q
                        .messages
                        .values()
                        .filter(|m| m.is_visible_at(now_millis))
                        .count() as i64,
                    archived_length: q.archive.len() as i64,
                    total_messages: q.last_id,
                    oldest_msg_age_secs: q.messages.values().map(|m| m.enqueued_at).min().map(age),
                    newest_msg_age_secs: q.messages.values().map(|m| m.enqueued_at).max().map(age),
                    scrape_time: now_millis,
                }
            })
        }
    }

}
