// Leaseq Infrastructure - SQLite Adapter
// Implements: MessageStore (per-queue message + archive tables)

mod connection;
mod error;
mod message_store;
mod migration;
mod schema;

pub use connection::create_pool;
pub use message_store::SqliteMessageStore;
pub use migration::run_migrations;
