use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, instrument};

use crate::models::{ConnectionHealth, RetryPolicy};
use crate::services::retry::{retry_with_backoff, Retryable};
use shared_config::AppConfig;
use shared_database::DatabaseProbe;

/// Wraps calls to the datastore client with classification-aware retry and
/// exposes a health probe. Configuration is read once at construction.
pub struct ConnectionManager {
    probe: Arc<dyn DatabaseProbe>,
    policy: RetryPolicy,
    connection_count: u32,
    max_connections: u32,
    connection_timeout: Duration,
}

impl ConnectionManager {
    pub fn new(config: &AppConfig, probe: Arc<dyn DatabaseProbe>) -> Self {
        info!(
            max_connections = config.max_connections,
            connection_timeout_ms = config.connection_timeout.as_millis() as u64,
            "Connection manager initialized"
        );

        Self {
            probe,
            policy: RetryPolicy::from_config(config),
            connection_count: config.min_connections,
            max_connections: config.max_connections,
            connection_timeout: config.connection_timeout,
        }
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Retries with the configured policy.
    pub async fn execute<T, E, F, Fut>(&self, operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + Display,
    {
        retry_with_backoff(&self.policy, operation).await
    }

    pub async fn execute_with_retry<T, E, F, Fut>(
        &self,
        operation: F,
        max_retries: u32,
        base_delay: Duration,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + Display,
    {
        let policy = self.policy.with_retries(max_retries, base_delay);
        retry_with_backoff(&policy, operation).await
    }

    /// Times one probe round-trip. Never fails; a failed or timed-out probe is
    /// reported as unhealthy.
    #[instrument(skip(self))]
    pub async fn get_connection_health(&self) -> ConnectionHealth {
        let start = Instant::now();

        let is_healthy = match tokio::time::timeout(self.connection_timeout, self.probe.ping()).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                error!("Database health check failed: {}", e);
                false
            }
            Err(_) => {
                error!(
                    "Database health check timed out after {}ms",
                    self.connection_timeout.as_millis()
                );
                false
            }
        };

        let response_time_ms = start.elapsed().as_millis() as u64;
        debug!(is_healthy, response_time_ms, "Database health probe completed");

        ConnectionHealth {
            is_healthy,
            response_time_ms,
            connection_count: self.connection_count,
            max_connections: self.max_connections,
        }
    }

    pub async fn check_connection(&self) -> bool {
        self.get_connection_health().await.is_healthy
    }
}
