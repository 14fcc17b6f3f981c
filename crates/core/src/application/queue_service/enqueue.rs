// Enqueue Use Case

use crate::application::lease::LeaseManager;
use crate::domain::{DomainError, MessageId, MessagePayload, NewMessageBatch, QueueName};
use crate::error::{AppError, Result};
use crate::port::{MessageStore, PayloadValidator};
use tracing::debug;

/// Collaborators needed by the enqueue path
#[derive(Clone, Copy)]
pub struct EnqueueContext<'a> {
    pub store: &'a dyn MessageStore,
    pub validator: &'a dyn PayloadValidator,
    pub leases: &'a LeaseManager,
    pub strict_validation: bool,
}

/// Validate every payload (strict mode only)
///
/// All-or-nothing: the first invalid payload rejects the whole batch.
pub fn validate_payloads(
    validator: &dyn PayloadValidator,
    payloads: &[MessagePayload],
) -> std::result::Result<(), DomainError> {
    for (index, payload) in payloads.iter().enumerate() {
        if payload.as_str().trim().is_empty() {
            return Err(DomainError::InvalidPayload(format!(
                "payload #{} is empty",
                index
            )));
        }
        if !validator.is_well_formed(payload.as_str()) {
            return Err(DomainError::InvalidPayload(format!(
                "payload #{} is not well-formed JSON",
                index
            )));
        }
    }
    Ok(())
}

/// Execute enqueue use case (one atomic insert for the whole batch)
///
/// Validation order: queue name, delay, payloads. Nothing reaches the store
/// unless all three pass.
pub async fn execute(
    ctx: EnqueueContext<'_>,
    queue: &str,
    payloads: Vec<MessagePayload>,
    delay_seconds: i64,
) -> Result<Vec<MessageId>> {
    let queue = QueueName::new(queue)?;
    let window = ctx.leases.delay(delay_seconds)?;

    if ctx.strict_validation {
        validate_payloads(ctx.validator, &payloads)?;
    }

    let batch = NewMessageBatch {
        enqueued_at: window.issued_at,
        visible_at: window.visible_until,
        payloads,
    };

    let ids = ctx.store.insert_batch(&queue, &batch).await?;

    if ids.len() != batch.len() {
        return Err(AppError::storage_invariant(format!(
            "store returned {} ids for {} messages",
            ids.len(),
            batch.len()
        )));
    }

    debug!(
        queue = %queue,
        count = ids.len(),
        delay_seconds = delay_seconds,
        "Messages enqueued"
    );

    Ok(ids)
}

/// Enqueue a single message
pub async fn send_one(
    ctx: EnqueueContext<'_>,
    queue: &str,
    payload: MessagePayload,
    delay_seconds: i64,
) -> Result<MessageId> {
    execute(ctx, queue, vec![payload], delay_seconds)
        .await?
        .pop()
        .ok_or_else(|| AppError::storage_invariant("store returned no id for a single send"))
}
