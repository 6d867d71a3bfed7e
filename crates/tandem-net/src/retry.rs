use std::time::Duration;

use tandem_shared::constants::{
    DEFAULT_STREAM_MAX_RETRIES, DEFAULT_STREAM_RETRY_BASE_MS, DEFAULT_STREAM_RETRY_MAX_MS,
};

/// Reconnect schedule for the push stream.
///
/// Exponential backoff (`base * 2^attempt`) capped at `max_delay`. After
/// `max_attempts` consecutive failures the stream is given up until the
/// next attach. `None` retries forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    base_delay: Duration,
    max_delay: Duration,
    max_attempts: Option<u32>,
}

impl ReconnectPolicy {
    pub fn new(base_delay: Duration, max_delay: Duration, max_attempts: Option<u32>) -> Self {
        Self {
            base_delay,
            max_delay: max_delay.max(base_delay),
            max_attempts,
        }
    }

    /// Never reconnect.
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO, Some(0))
    }

    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    pub fn max_attempts(&self) -> Option<u32> {
        self.max_attempts
    }

    /// Delay before reconnect number `attempt` (0-based), or `None` once the
    /// attempt budget is spent.
    pub fn next_delay(&self, attempt: u32) -> Option<Duration> {
        if let Some(max) = self.max_attempts {
            if attempt >= max {
                return None;
            }
        }

        let multiplier = 1_u32 << attempt.min(20);
        Some(self.base_delay.saturating_mul(multiplier).min(self.max_delay))
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::new(
            Duration::from_millis(DEFAULT_STREAM_RETRY_BASE_MS),
            Duration::from_millis(DEFAULT_STREAM_RETRY_MAX_MS),
            Some(DEFAULT_STREAM_MAX_RETRIES),
        )
    }
}
