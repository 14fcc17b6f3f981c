// Engine Configuration

use crate::domain::QueueName;
use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};

/// Default delay applied by `send` (seconds)
pub const DEFAULT_DELAY_SECONDS: i64 = 0;

/// Default lease applied by `read` (seconds)
pub const DEFAULT_VISIBILITY_TIMEOUT_SECONDS: i64 = 30;

/// Engine defaults, passed to `QueueService` at construction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Delay used by `send`/`send_batch` when none is given
    pub delay_seconds: i64,

    /// Lease used by `read` when none is given
    pub visibility_timeout_seconds: i64,

    /// Reject empty or malformed JSON payloads at enqueue
    pub strict_validation: bool,

    /// Queues provisioned by `QueueService::provision_configured_queues`
    pub queues: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            delay_seconds: DEFAULT_DELAY_SECONDS,
            visibility_timeout_seconds: DEFAULT_VISIBILITY_TIMEOUT_SECONDS,
            strict_validation: true,
            queues: Vec::new(),
        }
    }
}

impl EngineConfig {
    /// Check the defaults are usable by the operations that consume them
    pub fn validate(&self) -> Result<()> {
        if self.delay_seconds < 0 {
            return Err(AppError::Config(format!(
                "delay_seconds must be >= 0 (got {})",
                self.delay_seconds
            )));
        }

        if self.visibility_timeout_seconds <= 0 {
            return Err(AppError::Config(format!(
                "visibility_timeout_seconds must be > 0 (got {})",
                self.visibility_timeout_seconds
            )));
        }

        self.queue_names()?;
        Ok(())
    }

    /// Configured queue names, validated
    pub fn queue_names(&self) -> Result<Vec<QueueName>> {
        self.queues
            .iter()
            .map(|name| {
                QueueName::new(name.as_str())
                    .map_err(|e| AppError::Config(format!("queues: {}", e)))
            })
            .collect()
    }
}
