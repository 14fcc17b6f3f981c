// Application Layer - Queue use cases

pub mod config;
pub mod lease;
pub mod queue_service;

// Re-exports
pub use config::EngineConfig;
pub use lease::{Lease, LeaseManager};
pub use queue_service::QueueService;
