//! Queue state survives closing and reopening the database

use leaseq_core::application::EngineConfig;
use leaseq_core::port::time_provider::mocks::MockTimeProvider;
use leaseq_integration_tests::{migrated_pool, service_on, TempDb, START_MILLIS};
use std::sync::Arc;

#[tokio::test]
async fn test_messages_and_leases_survive_restart() {
    let db = TempDb::new();
    let clock = Arc::new(MockTimeProvider::new(START_MILLIS));

    let (ids, leased) = {
        let pool = migrated_pool(&db.url()).await;
        let service = service_on(pool.clone(), clock.clone(), EngineConfig::default());
        service.create_queue("durable").await.unwrap();

        let ids = service
            .send_batch("durable", [r#"{"n":1}"#, r#"{"n":2}"#, r#"{"n":3}"#])
            .await
            .unwrap();
        let leased = service.read_with_visibility("durable", 60).await.unwrap().unwrap();
        service.archive("durable", ids[2]).await.unwrap();

        pool.close().await;
        (ids, leased)
    };

    assert!(db.path().exists());

    let pool = migrated_pool(&db.url()).await;
    let service = service_on(pool, clock.clone(), EngineConfig::default());

    let queues = service.list_queues().await.unwrap();
    assert_eq!(queues.len(), 1);
    assert_eq!(queues[0].name.as_str(), "durable");

    // The lease is persisted: only the second message is visible
    let visible = service.read_batch("durable", 60, 10).await.unwrap();
    assert_eq!(visible.iter().map(|m| m.id).collect::<Vec<_>>(), vec![ids[1]]);

    clock.advance_secs(60);
    let redelivered = service.read("durable").await.unwrap().unwrap();
    assert_eq!(redelivered.id, leased.id);
    assert_eq!(redelivered.read_count, 2);
    assert_eq!(redelivered.payload.as_str(), r#"{"n":1}"#);

    let archived = service.list_archived("durable", 10).await.unwrap();
    assert_eq!(archived.len(), 1);
    assert_eq!(archived[0].message.id, ids[2]);

    // The id sequence continues after restart
    let next = service.send("durable", "{}").await.unwrap();
    assert_eq!(next, ids[2] + 1);
}
