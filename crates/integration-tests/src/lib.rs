//! Shared fixtures for the end-to-end tests

use leaseq_core::application::{EngineConfig, QueueService};
use leaseq_core::port::time_provider::mocks::MockTimeProvider;
use leaseq_core::port::TimeProvider;
use leaseq_infra_sqlite::{create_pool, run_migrations, SqliteMessageStore};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Fixed start instant for the manual clock
pub const START_MILLIS: i64 = 1_700_000_000_000;

/// Migrated pool for `database_url`
pub async fn migrated_pool(database_url: &str) -> SqlitePool {
    let pool = create_pool(database_url).await.unwrap();
    run_migrations(&pool).await.unwrap();
    pool
}

pub fn service_on(
    pool: SqlitePool,
    clock: Arc<dyn TimeProvider>,
    config: EngineConfig,
) -> QueueService {
    QueueService::new(Arc::new(SqliteMessageStore::new(pool)), clock, config).unwrap()
}

/// Service over an in-memory database and a manual clock
pub async fn memory_service(config: EngineConfig) -> (QueueService, Arc<MockTimeProvider>) {
    let clock = Arc::new(MockTimeProvider::new(START_MILLIS));
    let pool = migrated_pool("sqlite::memory:").await;
    (service_on(pool, clock.clone(), config), clock)
}

/// Database file removed (with its WAL side files) on drop
pub struct TempDb {
    path: PathBuf,
}

impl TempDb {
    pub fn new() -> Self {
        let path = std::env::temp_dir().join(format!("leaseq_test_{}.db", uuid::Uuid::new_v4()));
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn url(&self) -> String {
        format!("sqlite://{}", self.path.display())
    }
}

impl Default for TempDb {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TempDb {
    fn drop(&mut self) {
        for suffix in ["", "-wal", "-shm"] {
            let mut file = self.path.clone().into_os_string();
            file.push(suffix);
            let _ = std::fs::remove_file(file);
        }
    }
}
