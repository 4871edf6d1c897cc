// =====================================================================================
// PERFORMANCE CELL INTEGRATION TESTS
// =====================================================================================

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use assert_matches::assert_matches;
use async_trait::async_trait;
use chrono::Utc;

use performance_cell::{
    measure_execution_time, Aggregate, Alert, AlertForwarder, AlertKind, Metric, MetricType,
    PerformanceMonitor, Rating,
};
use shared_config::AppConfig;
use shared_database::{DatabaseErrorKind, DisabledDatabase};
use shared_utils::test_utils::{FailingSink, MemorySink, TestConfig};

const HOUR: Duration = Duration::from_secs(3_600);

#[derive(Default)]
struct RecordingAlertForwarder {
    alerts: Mutex<Vec<Alert>>,
}

impl RecordingAlertForwarder {
    fn alerts(&self) -> Vec<Alert> {
        self.alerts.lock().unwrap().clone()
    }
}

#[async_trait]
impl AlertForwarder for RecordingAlertForwarder {
    async fn forward(&self, alert: &Alert) -> anyhow::Result<()> {
        self.alerts.lock().unwrap().push(alert.clone());
        Ok(())
    }
}

struct BrokenForwarder;

#[async_trait]
impl AlertForwarder for BrokenForwarder {
    async fn forward(&self, _alert: &Alert) -> anyhow::Result<()> {
        anyhow::bail!("pager unreachable")
    }
}

fn monitor_with(sink: Arc<MemorySink>) -> PerformanceMonitor {
    PerformanceMonitor::new(&TestConfig::default().to_app_config(), sink)
}

fn monitor() -> PerformanceMonitor {
    monitor_with(Arc::new(MemorySink::new()))
}

// Lets spawned sink writes run.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

#[tokio::test]
async fn test_summary_mean_and_p95() {
    let monitor = monitor();

    for value in (1..=10).map(|i| i as f64 * 100.0) {
        monitor.record_metric(Metric::new(MetricType::ApiResponse, value, "/api/projects")).await;
    }

    let summary = monitor.get_performance_summary(HOUR).await;
    let aggregate = summary.metrics[&MetricType::ApiResponse];

    assert_eq!(aggregate.count, 10);
    assert_eq!(aggregate.p95, 1000.0);
    assert!((aggregate.avg - 550.0).abs() < 1e-9);
    assert!(summary.alerts.is_empty());
}

#[tokio::test]
async fn test_threshold_breach_raises_exactly_one_alert() {
    let forwarder = Arc::new(RecordingAlertForwarder::default());
    let monitor = PerformanceMonitor::new(
        &TestConfig::default().to_app_config(),
        Arc::new(MemorySink::new()),
    )
    .with_forwarder(forwarder.clone());

    let alert = monitor
        .record_metric(Metric::new(MetricType::ApiResponse, 1500.0, "/x"))
        .await
        .expect("alert raised");

    assert_eq!(alert.kind, AlertKind::PerformanceDegradation);
    assert_eq!(alert.metric, MetricType::ApiResponse);
    assert_eq!(alert.value, 1500.0);
    assert_eq!(alert.threshold, 1000.0);
    assert_eq!(alert.label, "/x");

    let forwarded = forwarder.alerts();
    assert_eq!(forwarded.len(), 1);
    assert_eq!(forwarded[0].alert_id, alert.alert_id);
}

#[tokio::test]
async fn test_values_at_threshold_do_not_alert() {
    let forwarder = Arc::new(RecordingAlertForwarder::default());
    let monitor = monitor().with_forwarder(forwarder.clone());

    assert!(monitor.record_metric(Metric::new(MetricType::ApiResponse, 1000.0, "/x")).await.is_none());
    assert!(monitor.record_metric(Metric::new(MetricType::Cls, 0.05, "/")).await.is_none());
    assert!(forwarder.alerts().is_empty());
}

#[tokio::test]
async fn test_forwarding_failure_still_returns_alert() {
    let monitor = monitor().with_forwarder(Arc::new(BrokenForwarder));

    let alert = monitor.record_metric(Metric::new(MetricType::Lcp, 5_000.0, "/")).await;

    assert_matches!(alert, Some(Alert { metric: MetricType::Lcp, .. }));
}

#[tokio::test(start_paused = true)]
async fn test_persistence_failure_is_swallowed() {
    let sink = Arc::new(FailingSink::new(DatabaseErrorKind::Connection));
    let monitor = PerformanceMonitor::new(&TestConfig::default().to_app_config(), sink.clone());

    let alert = monitor
        .record_metric(Metric::new(MetricType::DatabaseQuery, 900.0, "select projects"))
        .await;
    settle().await;

    assert!(alert.is_some());
    assert_eq!(sink.attempts(), 1);
    assert_eq!(monitor.sample_count().await, 1);
}

#[tokio::test(start_paused = true)]
async fn test_sink_receives_page_load_columns() {
    let sink = Arc::new(MemorySink::new());
    let monitor = monitor_with(sink.clone());

    let mut lcp = Metric::new(MetricType::Lcp, 1_200.0, "/projects").with_session("session-1");
    lcp.connection_type = Some("4g".to_string());
    monitor.record_metric(lcp).await;
    monitor.record_metric(Metric::new(MetricType::ApiResponse, 80.0, "/api/blog")).await;
    settle().await;

    let records = sink.records();
    assert_eq!(records.len(), 2);

    assert_eq!(records[0].session_id, "session-1");
    assert_eq!(records[0].page, "/projects");
    assert_eq!(records[0].lcp, Some(1_200.0));
    assert_eq!(records[0].cls, None);
    assert_eq!(records[0].connection_type.as_deref(), Some("4g"));

    assert_eq!(records[1].session_id, "unknown");
    assert_eq!(records[1].lcp, None);
    assert_eq!(records[1].ttfb, None);
}

#[tokio::test(start_paused = true)]
async fn test_recording_does_not_wait_for_slow_sink() {
    let latency = Duration::from_secs(25);
    let sink = Arc::new(MemorySink::slow(latency));
    let monitor = monitor_with(sink.clone());

    let start = tokio::time::Instant::now();
    monitor.record_api_performance("/api/blog", "GET", 40.0, 200, None).await;
    let alert = monitor
        .record_metric(Metric::new(MetricType::Lcp, 6_000.0, "/projects"))
        .await;

    assert!(start.elapsed() < Duration::from_secs(1));
    assert!(alert.is_some());
    assert_eq!(monitor.sample_count().await, 2);
    assert!(sink.records().is_empty());

    tokio::time::sleep(latency + Duration::from_millis(1)).await;
    assert_eq!(sink.records().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_unconfigured_database_still_records() {
    let monitor = PerformanceMonitor::new(&TestConfig::default().to_app_config(), Arc::new(DisabledDatabase));

    let alert = monitor
        .record_metric(Metric::new(MetricType::Ttfb, 2_000.0, "/"))
        .await;
    settle().await;

    assert_matches!(alert, Some(Alert { metric: MetricType::Ttfb, .. }));
    assert_eq!(monitor.sample_count().await, 1);
}

#[tokio::test]
async fn test_summary_only_counts_samples_in_window() {
    let monitor = monitor();
    let two_hours_ago = Utc::now() - chrono::Duration::hours(2);

    monitor
        .record_metric(Metric::new(MetricType::Fcp, 9_000.0, "/").at(two_hours_ago))
        .await;
    monitor.record_metric(Metric::new(MetricType::Fcp, 1_000.0, "/")).await;

    let summary = monitor.get_performance_summary(HOUR).await;
    assert_eq!(summary.metrics[&MetricType::Fcp].count, 1);
    assert_eq!(summary.metrics[&MetricType::Fcp].p95, 1_000.0);

    let wide = monitor.get_performance_summary(HOUR * 3).await;
    assert_eq!(wide.metrics[&MetricType::Fcp].count, 2);
}

#[tokio::test]
async fn test_summary_synthesizes_p95_alerts() {
    let monitor = monitor();
    monitor.record_metric(Metric::new(MetricType::DatabaseQuery, 50.0, "q")).await;
    monitor.record_metric(Metric::new(MetricType::DatabaseQuery, 700.0, "q")).await;
    monitor.record_metric(Metric::new(MetricType::Ttfb, 300.0, "/")).await;

    let summary = monitor.get_performance_summary(HOUR).await;

    assert_eq!(summary.alerts.len(), 1);
    let alert = &summary.alerts[0];
    assert_eq!(alert.kind, AlertKind::Performance);
    assert_eq!(alert.metric, MetricType::DatabaseQuery);
    assert_eq!(alert.value, 700.0);
    assert_eq!(alert.threshold, 500.0);
    assert_eq!(alert.message, "DATABASE_QUERY P95 (700.00) exceeds threshold (500)");
}

#[tokio::test]
async fn test_core_web_vitals_overall_is_worst() {
    let aggregate = |p95: f64| Aggregate { avg: p95, p95, count: 1 };

    let mut metrics = BTreeMap::new();
    metrics.insert(MetricType::Lcp, aggregate(3_000.0));
    metrics.insert(MetricType::Cls, aggregate(0.3));

    let score = PerformanceMonitor::get_core_web_vitals_score(&metrics);
    assert_eq!(score.lcp, Rating::NeedsImprovement);
    assert_eq!(score.fid, Rating::Good);
    assert_eq!(score.cls, Rating::Poor);
    assert_eq!(score.overall, Rating::Poor);

    let empty = PerformanceMonitor::get_core_web_vitals_score(&BTreeMap::new());
    assert_eq!(empty.overall, Rating::Good);
}

#[tokio::test]
async fn test_buffer_keeps_newest_samples() {
    let config = AppConfig {
        metrics_buffer_limit: 3,
        ..TestConfig::default().to_app_config()
    };
    let monitor = PerformanceMonitor::new(&config, Arc::new(MemorySink::new()));

    for value in [1.0, 2.0, 3.0, 4.0, 5.0] {
        monitor.record_metric(Metric::new(MetricType::Fid, value, "/")).await;
    }

    assert_eq!(monitor.sample_count().await, 3);
    let summary = monitor.get_performance_summary(HOUR).await;
    assert!((summary.metrics[&MetricType::Fid].avg - 4.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_purge_and_reset() {
    let monitor = monitor();
    let stale = Utc::now() - chrono::Duration::minutes(61);

    monitor.record_metric(Metric::new(MetricType::Lcp, 100.0, "/").at(stale)).await;
    monitor.record_metric(Metric::new(MetricType::Lcp, 200.0, "/")).await;

    assert_eq!(monitor.purge_expired().await, 1);
    assert_eq!(monitor.sample_count().await, 1);

    monitor.reset().await;
    assert_eq!(monitor.sample_count().await, 0);
    assert!(monitor.get_performance_summary(HOUR).await.metrics.is_empty());
}

#[tokio::test]
async fn test_api_and_database_wrappers_record_samples() {
    let monitor = monitor();

    let slow = monitor
        .record_api_performance("/api/contact", "POST", 1_250.0, 500, Some("smtp timeout"))
        .await;
    let fast = monitor.record_api_performance("/api/blog", "GET", 40.0, 200, None).await;
    let query = monitor
        .record_database_performance("select * from projects", 20.0, Some("relation missing"))
        .await;

    assert_matches!(slow, Some(Alert { metric: MetricType::ApiResponse, .. }));
    assert!(fast.is_none());
    assert!(query.is_none());

    let summary = monitor.get_performance_summary(HOUR).await;
    assert_eq!(summary.metrics[&MetricType::ApiResponse].count, 2);
    assert_eq!(summary.metrics[&MetricType::DatabaseQuery].count, 1);
}

#[tokio::test(start_paused = true)]
async fn test_measure_execution_time_records_and_passes_through() {
    let monitor = monitor();

    let value = measure_execution_time(&monitor, "load featured projects", async {
        tokio::time::sleep(Duration::from_millis(600)).await;
        Ok::<_, String>(7)
    })
    .await;
    assert_eq!(value, Ok(7));

    let failed = measure_execution_time(&monitor, "load testimonials", async {
        Err::<u32, _>("connection reset".to_string())
    })
    .await;
    assert_eq!(failed, Err("connection reset".to_string()));

    let summary = monitor.get_performance_summary(HOUR).await;
    let queries = summary.metrics[&MetricType::DatabaseQuery];
    assert_eq!(queries.count, 2);
    assert!(queries.p95 >= 600.0);
}
