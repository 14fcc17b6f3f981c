// Queue Lifecycle Use Cases

use crate::application::lease::LeaseManager;
use crate::domain::{QueueMetrics, QueueName};
use crate::error::Result;
use crate::port::MessageStore;
use tracing::{debug, info};

/// Provision a queue
///
/// The name is validated before the store is touched.
pub async fn create(store: &dyn MessageStore, leases: &LeaseManager, name: &str) -> Result<QueueName> {
    let queue = QueueName::new(name)?;

    let created = store.create_queue(&queue, leases.now_millis()).await?;
    if created {
        info!(queue = %queue, "Queue created");
    } else {
        debug!(queue = %queue, "Queue already exists");
    }

    Ok(queue)
}

/// Drop a queue (both tables)
///
/// Fails with `QueueNotFound` if the queue does not exist.
pub async fn drop_queue(store: &dyn MessageStore, name: &str) -> Result<()> {
    let queue = QueueName::new(name)?;

    store.drop_queue(&queue).await?;
    info!(queue = %queue, "Queue dropped");

    Ok(())
}

/// Provision a list of already validated queues
pub async fn provision(
    store: &dyn MessageStore,
    leases: &LeaseManager,
    queues: Vec<QueueName>,
) -> Result<Vec<QueueName>> {
    for queue in &queues {
        if store.create_queue(queue, leases.now_millis()).await? {
            info!(queue = %queue, "Configured queue provisioned");
        }
    }

    Ok(queues)
}

pub async fn metrics(store: &dyn MessageStore, leases: &LeaseManager, name: &str) -> Result<QueueMetrics> {
    let queue = QueueName::new(name)?;
    store.metrics(&queue, leases.now_millis()).await
}

#[cfg(test)]
mod tests {
    use super::super::test_support::service_with;
    use crate::application::EngineConfig;
    use crate::error::AppError;

    #[tokio::test]
    async fn test_create_rejects_empty_name_before_store() {
        let (service, store, _) = service_with(EngineConfig::default());

        let err = service.create_queue("").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidArgument(_)));
        assert_eq!(store.call_count(), 0);
    }

    #[tokio::test]
    async fn test_create_is_idempotent() {
        let (service, _, _) = service_with(EngineConfig::default());

        service.create_queue("orders").await.unwrap();
        let id = service.send("orders", "{}").await.unwrap();
        service.create_queue("orders").await.unwrap();

        // Existing messages survive the second create
        let msg = service.pop("orders").await.unwrap().unwrap();
        assert_eq!(msg.id, id);
        assert_eq!(service.list_queues().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_drop_missing_queue_fails() {
        let (service, _, _) = service_with(EngineConfig::default());

        let err = service.drop_queue("ghost").await.unwrap_err();
        assert!(matches!(err, AppError::QueueNotFound(_)));
    }

    #[tokio::test]
    async fn test_drop_removes_queue() {
        let (service, _, _) = service_with(EngineConfig::default());
        service.create_queue("orders").await.unwrap();
        service.send("orders", "{}").await.unwrap();

        service.drop_queue("orders").await.unwrap();

        assert!(service.list_queues().await.unwrap().is_empty());
        let err = service.send("orders", "{}").await.unwrap_err();
        assert!(matches!(err, AppError::QueueNotFound(_)));
    }

    #[tokio::test]
    async fn test_provision_rejects_invalid_config_names_without_store_calls() {
        let config = EngineConfig {
            queues: vec!["ok".into()],
            ..Default::default()
        };
        let (mut service, store, _) = service_with(config);
        service.config.queues.push("not ok".into());

        let err = service.provision_configured_queues().await.unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
        assert_eq!(store.call_count(), 0);
    }

    #[tokio::test]
    async fn test_metrics() {
        let (service, _, clock) = service_with(EngineConfig::default());
        service.create_queue("stats").await.unwrap();

        service.send("stats", "{}").await.unwrap();
        clock.advance_secs(10);
        let second = service.send("stats", "{}").await.unwrap();
        service.read_with_visibility("stats", 60).await.unwrap();
        service.archive("stats", second).await.unwrap();
        clock.advance_secs(2);

        let metrics = service.metrics("stats").await.unwrap();
        assert_eq!(metrics.queue_length, 1);
        assert_eq!(metrics.visible_length, 0);
        assert_eq!(metrics.archived_length, 1);
        assert_eq!(metrics.total_messages, 2);
        assert_eq!(metrics.oldest_msg_age_secs, Some(12));
        assert_eq!(metrics.newest_msg_age_secs, Some(12));
    }
}
