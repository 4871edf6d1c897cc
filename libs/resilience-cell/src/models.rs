use std::time::Duration;
use serde::Serialize;

use shared_config::AppConfig;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectionHealth {
    pub is_healthy: bool,
    pub response_time_ms: u64,
    pub connection_count: u32,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(1_000),
            max_jitter: Duration::from_millis(1_000),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: config.retry_base_delay,
            ..Self::default()
        }
    }

    pub fn with_retries(mut self, max_retries: u32, base_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.base_delay = base_delay;
        self
    }

    /// Deterministic part of the wait after failed attempt `attempt` (1-based):
    /// `base_delay * 2^(attempt - 1)`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor)
    }
}
