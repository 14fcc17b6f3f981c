// Port Layer - Interfaces for external dependencies

pub mod message_store;
pub mod payload_validator;
pub mod time_provider;

// Re-exports
pub use message_store::MessageStore;
pub use payload_validator::{JsonPayloadValidator, PayloadValidator};
pub use time_provider::TimeProvider;
