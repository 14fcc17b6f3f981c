// Acknowledgment Use Cases (delete, archive)

use crate::application::lease::LeaseManager;
use crate::domain::{ArchivedMessage, MessageId, QueueName};
use crate::error::{AppError, Result};
use crate::port::MessageStore;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Put the ids the store reports back into request order
///
/// Ids requested more than once appear once, at their first position.
fn in_request_order(requested: &[MessageId], affected: Vec<MessageId>) -> Vec<MessageId> {
    let affected: HashSet<MessageId> = affected.into_iter().collect();
    let mut seen = HashSet::with_capacity(affected.len());

    requested
        .iter()
        .copied()
        .filter(|id| affected.contains(id) && seen.insert(*id))
        .collect()
}

fn log_outcome(queue: &QueueName, action: &'static str, requested: &[MessageId], done: &[MessageId]) {
    let unique = requested.iter().collect::<HashSet<_>>().len();
    if done.len() < unique {
        warn!(
            queue = %queue,
            action = action,
            requested = unique,
            affected = done.len(),
            "Some messages were already gone"
        );
    } else {
        debug!(queue = %queue, action = action, affected = done.len(), "Messages acknowledged");
    }
}

/// Delete messages, leased or not
///
/// Ids that no longer exist are skipped. Repeating a delete is harmless.
pub async fn delete(store: &dyn MessageStore, queue: &str, ids: &[MessageId]) -> Result<Vec<MessageId>> {
    let queue = QueueName::new(queue)?;

    let removed = store.delete_messages(&queue, ids).await?;
    let removed = in_request_order(ids, removed);
    log_outcome(&queue, "delete", ids, &removed);

    Ok(removed)
}

/// Move messages to the queue's archive, stamped with the current time
pub async fn archive(
    store: &dyn MessageStore,
    leases: &LeaseManager,
    queue: &str,
    ids: &[MessageId],
) -> Result<Vec<MessageId>> {
    let queue = QueueName::new(queue)?;

    let moved = store
        .archive_messages(&queue, ids, leases.now_millis())
        .await?;
    let moved = in_request_order(ids, moved);
    log_outcome(&queue, "archive", ids, &moved);

    Ok(moved)
}

/// Oldest archived messages first, at most `limit`
pub async fn list_archived(store: &dyn MessageStore, queue: &str, limit: i64) -> Result<Vec<ArchivedMessage>> {
    let queue = QueueName::new(queue)?;

    if limit <= 0 {
        return Err(AppError::InvalidArgument(format!(
            "limit must be positive (got {})",
            limit
        )));
    }

    store.list_archived(&queue, limit).await
}
