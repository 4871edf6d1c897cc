// =====================================================================================
// RESILIENCE CELL INTEGRATION TESTS
// =====================================================================================

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use resilience_cell::{retry_with_backoff, ConnectionManager, RetryPolicy};
use shared_database::{DatabaseError, DatabaseErrorKind, DisabledDatabase};
use shared_utils::test_utils::{FlakyOperation, ScriptedProbe, TestConfig};

fn manager_with_probe(probe: Arc<ScriptedProbe>) -> ConnectionManager {
    ConnectionManager::new(&TestConfig::default().to_app_config(), probe)
}

fn manager() -> ConnectionManager {
    manager_with_probe(Arc::new(ScriptedProbe::healthy(Duration::from_millis(5))))
}

#[tokio::test(start_paused = true)]
async fn test_transient_failures_are_retried_until_success() {
    let manager = manager();
    let flaky = FlakyOperation::new(2, DatabaseErrorKind::Connection, "row");
    let op = &flaky;

    let result = manager
        .execute_with_retry(move || op.call(), 3, Duration::from_millis(1000))
        .await;

    assert_eq!(result, Ok("row"));
    assert_eq!(flaky.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_integrity_violation_is_not_retried() {
    let manager = manager();

    for kind in [
        DatabaseErrorKind::UniqueViolation,
        DatabaseErrorKind::ForeignKeyViolation,
        DatabaseErrorKind::CheckViolation,
    ] {
        let flaky = FlakyOperation::always_failing(kind, ());
        let op = &flaky;

        let err = manager
            .execute_with_retry(move || op.call(), 3, Duration::from_millis(1000))
            .await
            .unwrap_err();

        assert_eq!(err, DatabaseError::new(kind, "attempt 1 failed"));
        assert_eq!(flaky.calls(), 1);
    }
}

#[tokio::test(start_paused = true)]
async fn test_last_error_surfaces_when_retries_exhausted() {
    let manager = manager();
    let flaky = FlakyOperation::always_failing(DatabaseErrorKind::Timeout, 0u32);
    let op = &flaky;

    let err = manager
        .execute_with_retry(move || op.call(), 3, Duration::from_millis(10))
        .await
        .unwrap_err();

    assert_matches!(err.kind, DatabaseErrorKind::Timeout);
    assert_eq!(err.message, "attempt 3 failed");
    assert_eq!(flaky.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_backoff_doubles_and_jitter_only_adds() {
    let base = Duration::from_millis(1000);
    let max_jitter = Duration::from_millis(1000);
    let manager = manager();
    let flaky = FlakyOperation::always_failing(DatabaseErrorKind::Unavailable, ());
    let op = &flaky;

    let _ = manager.execute_with_retry(move || op.call(), 4, base).await;

    let times = flaky.invocation_times();
    assert_eq!(times.len(), 4);

    for k in 2..=times.len() {
        let gap = times[k - 1] - times[k - 2];
        let floor = base * 2u32.pow(k as u32 - 2);
        assert!(gap >= floor, "gap before attempt {} was {:?}, expected >= {:?}", k, gap, floor);
        assert!(gap <= floor + max_jitter, "gap before attempt {} was {:?}", k, gap);
    }
}

#[tokio::test(start_paused = true)]
async fn test_zero_retries_still_runs_once() {
    let manager = manager();
    let flaky = FlakyOperation::always_failing(DatabaseErrorKind::Connection, ());
    let op = &flaky;

    let result = manager.execute_with_retry(move || op.call(), 0, Duration::from_millis(10)).await;

    assert!(result.is_err());
    assert_eq!(flaky.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_execute_uses_configured_policy() {
    let config = TestConfig {
        max_retries: 2,
        ..TestConfig::default()
    }
    .to_app_config();
    let manager = ConnectionManager::new(&config, Arc::new(DisabledDatabase));
    let flaky = FlakyOperation::always_failing(DatabaseErrorKind::Connection, ());
    let op = &flaky;

    assert_eq!(manager.retry_policy().max_retries, 2);
    assert!(manager.execute(move || op.call()).await.is_err());
    assert_eq!(flaky.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_anyhow_errors_are_classified_by_source() {
    let policy = RetryPolicy::default().with_retries(3, Duration::from_millis(10));

    let integrity_calls = AtomicUsize::new(0);
    let calls = &integrity_calls;
    let result: Result<(), anyhow::Error> = retry_with_backoff(&policy, move || async move {
        calls.fetch_add(1, Ordering::SeqCst);
        Err(anyhow::Error::new(DatabaseError::new(DatabaseErrorKind::UniqueViolation, "duplicate slug")))
    })
    .await;
    assert!(result.is_err());
    assert_eq!(integrity_calls.load(Ordering::SeqCst), 1);

    let opaque_calls = AtomicUsize::new(0);
    let calls = &opaque_calls;
    let result: Result<(), anyhow::Error> = retry_with_backoff(&policy, move || async move {
        calls.fetch_add(1, Ordering::SeqCst);
        Err(anyhow::anyhow!("socket hang up"))
    })
    .await;
    assert_eq!(result.unwrap_err().to_string(), "socket hang up");
    assert_eq!(opaque_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn test_health_reports_probe_round_trip() {
    let probe = Arc::new(ScriptedProbe::healthy(Duration::from_millis(25)));
    let manager = manager_with_probe(probe.clone());

    let health = manager.get_connection_health().await;

    assert!(health.is_healthy);
    assert!(health.response_time_ms >= 25);
    assert_eq!(health.connection_count, 0);
    assert_eq!(health.max_connections, 10);
    assert_eq!(probe.calls(), 1);
    assert!(manager.check_connection().await);
}

#[tokio::test(start_paused = true)]
async fn test_health_reports_failed_probe() {
    let manager = manager_with_probe(Arc::new(ScriptedProbe::failing(Duration::from_millis(3))));

    let health = manager.get_connection_health().await;

    assert!(!health.is_healthy);
    assert!(health.response_time_ms >= 3);
}

#[tokio::test(start_paused = true)]
async fn test_hung_probe_times_out_as_unhealthy() {
    let config = TestConfig {
        connection_timeout: Duration::from_millis(500),
        ..TestConfig::default()
    }
    .to_app_config();
    let manager = ConnectionManager::new(&config, Arc::new(ScriptedProbe::healthy(Duration::from_secs(60))));

    let health = manager.get_connection_health().await;

    assert!(!health.is_healthy);
    assert!(health.response_time_ms >= 500);
    assert!(health.response_time_ms < 60_000);
}

#[test]
fn test_backoff_schedule() {
    let policy = RetryPolicy::default();
    assert_eq!(policy.backoff(1), Duration::from_millis(1000));
    assert_eq!(policy.backoff(2), Duration::from_millis(2000));
    assert_eq!(policy.backoff(3), Duration::from_millis(4000));
}
