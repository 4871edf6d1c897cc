use std::fmt::Display;
use std::future::Future;
use tokio::time::Instant;
use tracing::debug;

use crate::services::PerformanceMonitor;

/// Awaits `operation` and records its duration as a datastore-query sample
/// labelled `label`. The operation's result is returned unchanged.
pub async fn measure_execution_time<T, E, Fut>(
    monitor: &PerformanceMonitor,
    label: &str,
    operation: Fut,
) -> Result<T, E>
where
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let start = Instant::now();
    let result = operation.await;
    let duration_ms = start.elapsed().as_secs_f64() * 1_000.0;

    match &result {
        Ok(_) => {
            debug!(label, duration_ms, "Operation executed");
            monitor.record_database_performance(label, duration_ms, None).await;
        }
        Err(e) => {
            let message = e.to_string();
            monitor
                .record_database_performance(label, duration_ms, Some(&message))
                .await;
        }
    }

    result
}
