// Queue Domain Model

use crate::domain::error::{DomainError, Result};
use serde::{Deserialize, Serialize};

/// Longest accepted queue name.
///
/// Queue names become part of table identifiers (`q_<name>`, `a_<name>`), so
/// the bound leaves room for the prefixes within common identifier limits.
pub const MAX_QUEUE_NAME_LEN: usize = 47;

/// Prefix of the active message table
pub const MESSAGE_TABLE_PREFIX: &str = "q_";

/// Prefix of the archive table
pub const ARCHIVE_TABLE_PREFIX: &str = "a_";

/// Validated queue name
///
/// The only way to build one is [`QueueName::new`], which enforces the
/// identifier allow-list: an ASCII letter or `_` first, then ASCII
/// alphanumerics or `_`. Storage adapters may therefore splice the name into
/// table identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct QueueName(String);

impl QueueName {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();

        if name.is_empty() {
            return Err(DomainError::InvalidQueueName(
                "queue name must not be empty".to_string(),
            ));
        }

        if name.len() > MAX_QUEUE_NAME_LEN {
            return Err(DomainError::InvalidQueueName(format!(
                "queue name too long ({} > {} characters)",
                name.len(),
                MAX_QUEUE_NAME_LEN
            )));
        }

        let mut chars = name.chars();
        let first_ok = chars
            .next()
            .map(|c| c.is_ascii_alphabetic() || c == '_')
            .unwrap_or(false);

        if !first_ok || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(DomainError::InvalidQueueName(format!(
                "queue name '{}' must start with a letter or '_' and contain only alphanumeric characters or '_'",
                name
            )));
        }

        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Identifier of the active message table
    pub fn message_table(&self) -> String {
        format!("{}{}", MESSAGE_TABLE_PREFIX, self.0)
    }

    /// Identifier of the archive table
    pub fn archive_table(&self) -> String {
        format!("{}{}", ARCHIVE_TABLE_PREFIX, self.0)
    }
}

impl std::fmt::Display for QueueName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for QueueName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for QueueName {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl TryFrom<&str> for QueueName {
    type Error = DomainError;

    fn try_from(value: &str) -> Result<Self> {
        Self::new(value)
    }
}

impl From<QueueName> for String {
    fn from(value: QueueName) -> Self {
        value.0
    }
}

/// Registry entry for a provisioned queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueInfo {
    pub name: QueueName,
    pub created_at: i64, // epoch ms
}

/// Point-in-time queue statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueMetrics {
    pub queue_name: QueueName,
    /// Messages in the active table (visible or leased)
    pub queue_length: i64,
    /// Messages a dequeue would see right now
    pub visible_length: i64,
    pub archived_length: i64,
    /// Messages ever sent since the queue was created
    pub total_messages: i64,
    pub oldest_msg_age_secs: Option<i64>,
    pub newest_msg_age_secs: Option<i64>,
    pub scrape_time: i64, // epoch ms
}
