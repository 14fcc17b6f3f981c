// Lease Manager - visibility windows for enqueue delay and dequeue leases

use crate::domain::DomainError;
use crate::port::TimeProvider;
use std::sync::Arc;

const MILLIS_PER_SECOND: i64 = 1000;

/// Visibility window produced for one operation
///
/// `issued_at` is the instant the operation evaluates visibility against;
/// `visible_until` is the instant affected messages become visible again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lease {
    pub issued_at: i64,     // epoch ms
    pub visible_until: i64, // epoch ms
}

/// Computes and validates visibility windows
///
/// All windows are derived from one reading of the injected clock so a
/// single operation never mixes two different "now" values.
pub struct LeaseManager {
    time_provider: Arc<dyn TimeProvider>,
}

impl LeaseManager {
    pub fn new(time_provider: Arc<dyn TimeProvider>) -> Self {
        Self { time_provider }
    }

    pub fn now_millis(&self) -> i64 {
        self.time_provider.now_millis()
    }

    /// Window for a dequeue lease; `visibility_seconds` must be > 0
    pub fn lease(&self, visibility_seconds: i64) -> Result<Lease, DomainError> {
        if visibility_seconds <= 0 {
            return Err(DomainError::InvalidDuration(format!(
                "visibility timeout must be positive (got {})",
                visibility_seconds
            )));
        }
        self.window(visibility_seconds, "visibility timeout")
    }

    /// Window for an enqueue delay; `delay_seconds` must be >= 0
    pub fn delay(&self, delay_seconds: i64) -> Result<Lease, DomainError> {
        if delay_seconds < 0 {
            return Err(DomainError::InvalidDuration(format!(
                "delay must be zero or positive (got {})",
                delay_seconds
            )));
        }
        self.window(delay_seconds, "delay")
    }

    /// Window for a lease extension; 0 releases the message immediately
    pub fn extension(&self, visibility_seconds: i64) -> Result<Lease, DomainError> {
        if visibility_seconds < 0 {
            return Err(DomainError::InvalidDuration(format!(
                "visibility timeout must be zero or positive (got {})",
                visibility_seconds
            )));
        }
        self.window(visibility_seconds, "visibility timeout")
    }

    fn window(&self, seconds: i64, what: &str) -> Result<Lease, DomainError> {
        let now = self.now_millis();
        let visible_until = seconds
            .checked_mul(MILLIS_PER_SECOND)
            .and_then(|millis| now.checked_add(millis))
            .ok_or_else(|| DomainError::InvalidDuration(format!("{} too large: {}s", what, seconds)))?;

        Ok(Lease {
            issued_at: now,
            visible_until,
        })
    }
}
