use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use rand::Rng;
use tracing::{error, warn};

use crate::models::RetryPolicy;
use shared_database::DatabaseError;

/// Failures that know whether another attempt could succeed.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

impl Retryable for DatabaseError {
    fn is_retryable(&self) -> bool {
        DatabaseError::is_retryable(self)
    }
}

// Anything that is not a classified datastore error is treated as transient.
impl Retryable for anyhow::Error {
    fn is_retryable(&self) -> bool {
        self.downcast_ref::<DatabaseError>()
            .map_or(true, DatabaseError::is_retryable)
    }
}

fn jitter(max: Duration) -> Duration {
    let max_ms = max.as_millis() as u64;
    Duration::from_millis(rand::thread_rng().gen_range(0..=max_ms))
}

fn retry_delay(policy: &RetryPolicy, attempt: u32) -> Duration {
    policy.backoff(attempt).saturating_add(jitter(policy.max_jitter))
}

/// Runs `operation` until it succeeds, fails with a non-retryable error, or
/// `policy.max_retries` attempts have been made. The final error is returned
/// unchanged. There is no cancellation once started.
pub async fn retry_with_backoff<T, E, F, Fut>(policy: &RetryPolicy, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + Display,
{
    let max_attempts = policy.max_retries.max(1);
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_retryable() => {
                error!(attempt, "Non-retryable failure: {}", e);
                return Err(e);
            }
            Err(e) if attempt >= max_attempts => {
                warn!(attempts = attempt, "Retries exhausted: {}", e);
                return Err(e);
            }
            Err(e) => {
                let delay = retry_delay(policy, attempt);
                warn!(
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    "Operation failed, retrying: {}", e
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
