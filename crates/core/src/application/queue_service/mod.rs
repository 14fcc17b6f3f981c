// Queue Service - caller-facing API of the engine

pub mod ack;
pub mod dequeue;
pub mod enqueue;
pub mod lifecycle;

use crate::application::config::EngineConfig;
use crate::application::lease::LeaseManager;
use crate::domain::{
    ArchivedMessage, Message, MessageId, MessagePayload, QueueInfo, QueueMetrics, QueueName,
};
use crate::error::Result;
use crate::port::{JsonPayloadValidator, MessageStore, PayloadValidator, TimeProvider};
use serde::Serialize;
use std::sync::Arc;

/// Queue engine entry point
///
/// Holds no queue or message state of its own: every call is evaluated
/// against the store, and all mutual exclusion is left to the store's
/// transactions.
pub struct QueueService {
    store: Arc<dyn MessageStore>,
    validator: Arc<dyn PayloadValidator>,
    leases: LeaseManager,
    config: EngineConfig,
}

impl QueueService {
    /// Create a service with the JSON payload validator
    ///
    /// # Errors
    /// `AppError::Config` if `config` does not validate.
    pub fn new(
        store: Arc<dyn MessageStore>,
        time_provider: Arc<dyn TimeProvider>,
        config: EngineConfig,
    ) -> Result<Self> {
        Self::with_validator(store, Arc::new(JsonPayloadValidator), time_provider, config)
    }

    pub fn with_validator(
        store: Arc<dyn MessageStore>,
        validator: Arc<dyn PayloadValidator>,
        time_provider: Arc<dyn TimeProvider>,
        config: EngineConfig,
    ) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            store,
            validator,
            leases: LeaseManager::new(time_provider),
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Provision a queue (idempotent)
    pub async fn create_queue(&self, name: &str) -> Result<QueueName> {
        lifecycle::create(self.store.as_ref(), &self.leases, name).await
    }

    /// Drop a queue and its archive; `QueueNotFound` if it does not exist
    pub async fn drop_queue(&self, name: &str) -> Result<()> {
        lifecycle::drop_queue(self.store.as_ref(), name).await
    }

    pub async fn list_queues(&self) -> Result<Vec<QueueInfo>> {
        self.store.list_queues().await
    }

    /// Create every queue listed in the configuration
    pub async fn provision_configured_queues(&self) -> Result<Vec<QueueName>> {
        let names = self.config.queue_names()?;
        lifecycle::provision(self.store.as_ref(), &self.leases, names).await
    }

    pub async fn metrics(&self, queue: &str) -> Result<QueueMetrics> {
        lifecycle::metrics(self.store.as_ref(), &self.leases, queue).await
    }

    // ------------------------------------------------------------------
    // Enqueue
    // ------------------------------------------------------------------

    /// Send one message with the configured default delay
    pub async fn send(&self, queue: &str, payload: impl Into<MessagePayload>) -> Result<MessageId> {
        self.send_with_delay(queue, payload, self.config.delay_seconds)
            .await
    }

    pub async fn send_with_delay(
        &self,
        queue: &str,
        payload: impl Into<MessagePayload>,
        delay_seconds: i64,
    ) -> Result<MessageId> {
        enqueue::send_one(self.enqueue_ctx(), queue, payload.into(), delay_seconds).await
    }

    /// Serialize `value` as JSON and send it with the configured default delay
    pub async fn send_json<T: Serialize + ?Sized>(&self, queue: &str, value: &T) -> Result<MessageId> {
        let payload = MessagePayload::from_json(value)?;
        self.send(queue, payload).await
    }

    /// Send a batch atomically with the configured default delay
    pub async fn send_batch<P>(&self, queue: &str, payloads: P) -> Result<Vec<MessageId>>
    where
        P: IntoIterator,
        P::Item: Into<MessagePayload>,
    {
        self.send_batch_with_delay(queue, payloads, self.config.delay_seconds)
            .await
    }

    pub async fn send_batch_with_delay<P>(
        &self,
        queue: &str,
        payloads: P,
        delay_seconds: i64,
    ) -> Result<Vec<MessageId>>
    where
        P: IntoIterator,
        P::Item: Into<MessagePayload>,
    {
        let payloads = payloads.into_iter().map(Into::into).collect();
        enqueue::execute(self.enqueue_ctx(), queue, payloads, delay_seconds).await
    }

    fn enqueue_ctx(&self) -> enqueue::EnqueueContext<'_> {
        enqueue::EnqueueContext {
            store: self.store.as_ref(),
            validator: self.validator.as_ref(),
            leases: &self.leases,
            strict_validation: self.config.strict_validation,
        }
    }

    // ------------------------------------------------------------------
    // Dequeue
    // ------------------------------------------------------------------

    /// Read at most one message under the configured default lease
    pub async fn read(&self, queue: &str) -> Result<Option<Message>> {
        self.read_with_visibility(queue, self.config.visibility_timeout_seconds)
            .await
    }

    pub async fn read_with_visibility(
        &self,
        queue: &str,
        visibility_seconds: i64,
    ) -> Result<Option<Message>> {
        dequeue::read_one(self.store.as_ref(), &self.leases, queue, visibility_seconds).await
    }

    /// Read up to `quantity` messages under one lease
    pub async fn read_batch(
        &self,
        queue: &str,
        visibility_seconds: i64,
        quantity: i64,
    ) -> Result<Vec<Message>> {
        dequeue::read_batch(
            self.store.as_ref(),
            &self.leases,
            queue,
            visibility_seconds,
            quantity,
        )
        .await
    }

    /// Read and delete one message without a lease
    pub async fn pop(&self, queue: &str) -> Result<Option<Message>> {
        dequeue::pop(self.store.as_ref(), &self.leases, queue).await
    }

    /// Move a message's visibility to `now + visibility_seconds`
    pub async fn set_visibility(
        &self,
        queue: &str,
        id: MessageId,
        visibility_seconds: i64,
    ) -> Result<Option<Message>> {
        dequeue::set_visibility(
            self.store.as_ref(),
            &self.leases,
            queue,
            id,
            visibility_seconds,
        )
        .await
    }

    // ------------------------------------------------------------------
    // Acknowledgment
    // ------------------------------------------------------------------

    /// Delete one message; false if it was not there
    pub async fn delete(&self, queue: &str, id: MessageId) -> Result<bool> {
        Ok(!self.delete_batch(queue, &[id]).await?.is_empty())
    }

    /// Delete messages; returns the ids actually removed
    pub async fn delete_batch(&self, queue: &str, ids: &[MessageId]) -> Result<Vec<MessageId>> {
        ack::delete(self.store.as_ref(), queue, ids).await
    }

    /// Archive one message; false if it was not there
    pub async fn archive(&self, queue: &str, id: MessageId) -> Result<bool> {
        Ok(!self.archive_batch(queue, &[id]).await?.is_empty())
    }

    /// Archive messages; returns the ids actually moved
    pub async fn archive_batch(&self, queue: &str, ids: &[MessageId]) -> Result<Vec<MessageId>> {
        ack::archive(self.store.as_ref(), &self.leases, queue, ids).await
    }

    pub async fn list_archived(&self, queue: &str, limit: i64) -> Result<Vec<ArchivedMessage>> {
        ack::list_archived(self.store.as_ref(), queue, limit).await
    }
}
