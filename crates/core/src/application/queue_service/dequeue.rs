// Dequeue Use Cases (read-and-lease, pop, lease extension)

use crate::application::lease::LeaseManager;
use crate::domain::{Message, MessageId, QueueName};
use crate::error::{AppError, Result};
use crate::port::MessageStore;
use tracing::debug;

/// Lease up to `quantity` visible messages for `visibility_seconds`
///
/// Never waits for messages: returns whatever is visible right now, possibly
/// nothing. Results are ordered by id.
pub async fn read_batch(
    store: &dyn MessageStore,
    leases: &LeaseManager,
    queue: &str,
    visibility_seconds: i64,
    quantity: i64,
) -> Result<Vec<Message>> {
    let queue = QueueName::new(queue)?;

    let lease = leases.lease(visibility_seconds)?;

    if quantity <= 0 {
        return Err(AppError::InvalidArgument(format!(
            "quantity must be positive (got {})",
            quantity
        )));
    }

    let mut messages = store
        .read_and_lease(&queue, lease.issued_at, lease.visible_until, quantity)
        .await?;
    messages.sort_by_key(|m| m.id);

    debug!(
        queue = %queue,
        requested = quantity,
        leased = messages.len(),
        visible_until = lease.visible_until,
        "Messages leased"
    );

    Ok(messages)
}

/// Lease at most one message
///
/// More than one row from the store is an invariant violation and surfaces
/// as a storage error.
pub async fn read_one(
    store: &dyn MessageStore,
    leases: &LeaseManager,
    queue: &str,
    visibility_seconds: i64,
) -> Result<Option<Message>> {
    let mut messages = read_batch(store, leases, queue, visibility_seconds, 1).await?;

    match messages.len() {
        0 | 1 => Ok(messages.pop()),
        n => Err(AppError::storage_invariant(format!(
            "single read returned {} messages",
            n
        ))),
    }
}

/// Remove and return the oldest visible message, without leasing
pub async fn pop(store: &dyn MessageStore, leases: &LeaseManager, queue: &str) -> Result<Option<Message>> {
    let queue = QueueName::new(queue)?;

    let message = store.pop(&queue, leases.now_millis()).await?;
    if let Some(msg) = &message {
        debug!(queue = %queue, id = msg.id, "Message popped");
    }

    Ok(message)
}

/// Set a message's visibility to `now + visibility_seconds`
///
/// Extends a lease still being worked on, or releases it early with 0.
pub async fn set_visibility(
    store: &dyn MessageStore,
    leases: &LeaseManager,
    queue: &str,
    id: MessageId,
    visibility_seconds: i64,
) -> Result<Option<Message>> {
    let queue = QueueName::new(queue)?;
    let window = leases.extension(visibility_seconds)?;

    let message = store
        .set_visible_at(&queue, id, window.visible_until)
        .await?;

    debug!(
        queue = %queue,
        id = id,
        found = message.is_some(),
        visible_until = window.visible_until,
        "Visibility updated"
    );

    Ok(message)
}

#[cfg(test)]
mod tests {
    use super::super::test_support::service_with;
    use super::*;
    use crate::application::EngineConfig;
    use crate::port::TimeProvider;
    use std::collections::HashSet;

    #[tokio::test]
    async fn test_read_rejects_bad_arguments_before_store() {
        let (service, store, _) = service_with(EngineConfig::default());

        for (vt, qty) in [(0, 1), (-5, 1), (5, 0), (5, -1)] {
            let err = service.read_batch("orders", vt, qty).await.unwrap_err();
            assert!(matches!(err, AppError::InvalidArgument(_)), "vt={vt} qty={qty}");
        }
        assert_eq!(store.call_count(), 0);
    }

    #[tokio::test]
    async fn test_quantity_error_message() {
        let (service, _, _) = service_with(EngineConfig::default());

        let err = service.read_batch("orders", 5, 0).await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid argument: quantity must be positive (got 0)");
    }

    #[tokio::test]
    async fn test_read_returns_fewer_than_requested() {
        let (service, _, _) = service_with(EngineConfig::default());
        service.create_queue("orders").await.unwrap();
        service.send_batch("orders", ["{}", "{}"]).await.unwrap();

        let messages = service.read_batch("orders", 30, 10).await.unwrap();
        assert_eq!(messages.len(), 2);
        assert!(messages.iter().all(|m| m.read_count == 1));

        assert!(service.read_batch("orders", 30, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_read_is_oldest_first() {
        let (service, _, _) = service_with(EngineConfig::default());
        service.create_queue("orders").await.unwrap();
        let ids = service.send_batch("orders", ["{}", "{}", "{}"]).await.unwrap();

        let first = service.read_batch("orders", 30, 2).await.unwrap();
        assert_eq!(first.iter().map(|m| m.id).collect::<Vec<_>>(), ids[..2]);
    }

    #[tokio::test]
    async fn test_lease_hides_message_until_expiry() {
        let (service, _, clock) = service_with(EngineConfig::default());
        service.create_queue("orders").await.unwrap();
        service.send("orders", "{}").await.unwrap();

        let leased = service.read_with_visibility("orders", 10).await.unwrap().unwrap();
        assert_eq!(leased.visible_at, clock.now_millis() + 10_000);

        clock.advance_millis(9_999);
        assert!(service.read("orders").await.unwrap().is_none());

        clock.advance_millis(1);
        assert_eq!(service.read("orders").await.unwrap().unwrap().read_count, 2);
    }

    #[tokio::test]
    async fn test_pop_removes_message() {
        let (service, _, clock) = service_with(EngineConfig::default());
        service.create_queue("orders").await.unwrap();
        let id = service.send("orders", "{}").await.unwrap();

        let popped = service.pop("orders").await.unwrap().unwrap();
        assert_eq!(popped.id, id);
        assert_eq!(popped.read_count, 0);

        assert!(service.read("orders").await.unwrap().is_none());
        clock.advance_secs(3600);
        assert!(service.read("orders").await.unwrap().is_none());
        assert!(service.pop("orders").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_pop_skips_leased_messages() {
        let (service, _, _) = service_with(EngineConfig::default());
        service.create_queue("orders").await.unwrap();
        let ids = service.send_batch("orders", ["{}", "{}"]).await.unwrap();

        service.read_with_visibility("orders", 30).await.unwrap();
        let popped = service.pop("orders").await.unwrap().unwrap();
        assert_eq!(popped.id, ids[1]);
    }

    #[tokio::test]
    async fn test_set_visibility_extends_and_releases() {
        let (service, _, clock) = service_with(EngineConfig::default());
        service.create_queue("orders").await.unwrap();
        let id = service.send("orders", "{}").await.unwrap();
        service.read_with_visibility("orders", 5).await.unwrap();

        let extended = service.set_visibility("orders", id, 60).await.unwrap().unwrap();
        assert_eq!(extended.visible_at, clock.now_millis() + 60_000);

        clock.advance_secs(30);
        assert!(service.read("orders").await.unwrap().is_none());

        service.set_visibility("orders", id, 0).await.unwrap();
        assert_eq!(service.read("orders").await.unwrap().unwrap().id, id);

        assert!(service.set_visibility("orders", 999, 5).await.unwrap().is_none());
        let err = service.set_visibility("orders", id, -1).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_concurrent_reads_never_share_messages() {
        let (service, _, _) = service_with(EngineConfig::default());
        let service = std::sync::Arc::new(service);
        service.create_queue("orders").await.unwrap();
        let payloads: Vec<String> = (0..50).map(|i| format!(r#"{{"i":{}}}"#, i)).collect();
        service.send_batch("orders", payloads).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let service = service.clone();
            handles.push(tokio::spawn(async move {
                let mut seen = Vec::new();
                loop {
                    let batch = service.read_batch("orders", 60, 3).await.unwrap();
                    if batch.is_empty() {
                        break;
                    }
                    seen.extend(batch.into_iter().map(|m| m.id));
                }
                seen
            }));
        }

        let mut all = Vec::new();
        for handle in handles {
            all.extend(handle.await.unwrap());
        }

        let unique: HashSet<_> = all.iter().collect();
        assert_eq!(all.len(), 50);
        assert_eq!(unique.len(), 50);
    }
}
