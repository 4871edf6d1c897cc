// =====================================================================================
// PERFORMANCE MONITOR SERVICE
// =====================================================================================

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::models::{
    Aggregate, Alert, AlertKind, CoreWebVitalsScore, Metric, MetricType, PerformanceSummary,
    Rating,
};
use shared_config::AppConfig;
use shared_database::{DatabaseErrorKind, PerformanceRecord, PerformanceSink};

/// External collaborator that receives each raised alert once.
#[async_trait]
pub trait AlertForwarder: Send + Sync {
    async fn forward(&self, alert: &Alert) -> anyhow::Result<()>;
}

pub struct PerformanceMonitor {
    samples: RwLock<VecDeque<Metric>>,
    sink: Arc<dyn PerformanceSink>,
    forwarder: Option<Arc<dyn AlertForwarder>>,
    retention: Duration,
    buffer_limit: usize,
}

impl PerformanceMonitor {
    pub fn new(config: &AppConfig, sink: Arc<dyn PerformanceSink>) -> Self {
        info!(
            retention_ms = config.metrics_retention.as_millis() as u64,
            buffer_limit = config.metrics_buffer_limit,
            "Performance monitor initialized"
        );

        Self {
            samples: RwLock::new(VecDeque::new()),
            sink,
            forwarder: None,
            retention: config.metrics_retention,
            buffer_limit: config.metrics_buffer_limit.max(1),
        }
    }

    pub fn with_forwarder(mut self, forwarder: Arc<dyn AlertForwarder>) -> Self {
        self.forwarder = Some(forwarder);
        self
    }

    /// Buffers the sample, hands it to the sink in the background and checks it
    /// against its threshold. Never waits on the sink. Returns the alert raised
    /// for this sample, if any.
    #[instrument(skip(self, metric), fields(metric_type = %metric.metric_type, label = %metric.label))]
    pub async fn record_metric(&self, metric: Metric) -> Option<Alert> {
        {
            let mut samples = self.samples.write().await;
            samples.push_back(metric.clone());
            while samples.len() > self.buffer_limit {
                samples.pop_front();
            }
        }

        self.persist(&metric);
        self.check_threshold(&metric).await
    }

    pub async fn record_api_performance(
        &self,
        endpoint: &str,
        method: &str,
        response_time_ms: f64,
        status_code: u16,
        error: Option<&str>,
    ) -> Option<Alert> {
        let alert = self
            .record_metric(Metric::new(MetricType::ApiResponse, response_time_ms, endpoint))
            .await;

        if response_time_ms > MetricType::ApiResponse.thresholds().needs_improvement {
            warn!(method, endpoint, response_time_ms, "Slow API call detected");
        }

        if status_code >= 400 || error.is_some() {
            error!(
                method,
                endpoint,
                status_code,
                error = error.unwrap_or_default(),
                "API error"
            );
        }

        alert
    }

    pub async fn record_database_performance(
        &self,
        query: &str,
        duration_ms: f64,
        error: Option<&str>,
    ) -> Option<Alert> {
        let alert = self
            .record_metric(Metric::new(MetricType::DatabaseQuery, duration_ms, query))
            .await;

        if duration_ms > MetricType::DatabaseQuery.thresholds().needs_improvement {
            warn!(query, duration_ms, "Slow database query detected");
        }

        if let Some(error) = error {
            error!(query, error, "Database query error");
        }

        alert
    }

    /// Mean and p95 per metric type over samples in `[now - time_range, now]`,
    /// plus one alert for every type whose p95 is above its threshold.
    pub async fn get_performance_summary(&self, time_range: Duration) -> PerformanceSummary {
        let now = Utc::now();
        let cutoff = chrono::Duration::from_std(time_range)
            .ok()
            .and_then(|range| now.checked_sub_signed(range));

        let mut grouped: BTreeMap<MetricType, Vec<f64>> = BTreeMap::new();
        {
            let samples = self.samples.read().await;
            for sample in samples.iter() {
                let in_window = sample.timestamp <= now
                    && cutoff.map_or(true, |cutoff| sample.timestamp >= cutoff);
                if in_window {
                    grouped.entry(sample.metric_type).or_default().push(sample.value);
                }
            }
        }

        let mut metrics = BTreeMap::new();
        let mut alerts = Vec::new();

        for (metric_type, mut values) in grouped {
            values.sort_by(|a, b| a.total_cmp(b));

            let count = values.len();
            let avg = values.iter().sum::<f64>() / count as f64;
            let p95_index = (count as f64 * 0.95) as usize;
            let p95 = values.get(p95_index).copied().unwrap_or(0.0);

            let threshold = metric_type.thresholds().needs_improvement;
            if p95 > threshold {
                alerts.push(Alert {
                    alert_id: Uuid::new_v4(),
                    kind: AlertKind::Performance,
                    metric: metric_type,
                    value: p95,
                    threshold,
                    label: "p95".to_string(),
                    timestamp: now,
                    message: format!(
                        "{} P95 ({:.2}) exceeds threshold ({})",
                        metric_type, p95, threshold
                    ),
                });
            }

            metrics.insert(metric_type, Aggregate { avg, p95, count });
        }

        PerformanceSummary { metrics, alerts }
    }

    /// Rates the p95 of LCP, FID and CLS. A missing aggregate rates as good.
    pub fn get_core_web_vitals_score(metrics: &BTreeMap<MetricType, Aggregate>) -> CoreWebVitalsScore {
        let rate = |metric_type: MetricType| {
            metrics
                .get(&metric_type)
                .map_or(Rating::Good, |aggregate| {
                    Rating::classify(aggregate.p95, metric_type.thresholds())
                })
        };

        let lcp = rate(MetricType::Lcp);
        let fid = rate(MetricType::Fid);
        let cls = rate(MetricType::Cls);

        CoreWebVitalsScore {
            lcp,
            fid,
            cls,
            overall: lcp.max(fid).max(cls),
        }
    }

    /// Drops samples older than the retention window. Returns how many were dropped.
    pub async fn purge_expired(&self) -> usize {
        let Some(cutoff) = chrono::Duration::from_std(self.retention)
            .ok()
            .and_then(|retention| Utc::now().checked_sub_signed(retention))
        else {
            return 0;
        };

        let mut samples = self.samples.write().await;
        let before = samples.len();
        samples.retain(|sample| sample.timestamp > cutoff);
        let purged = before - samples.len();

        debug!(purged, remaining = samples.len(), "Purged expired performance samples");
        purged
    }

    pub async fn sample_count(&self) -> usize {
        self.samples.read().await.len()
    }

    pub async fn reset(&self) {
        self.samples.write().await.clear();
    }

    fn persist(&self, metric: &Metric) {
        let mut record = PerformanceRecord::new(
            metric.session_id.as_deref().unwrap_or("unknown"),
            metric.label.as_str(),
        );
        record.connection_type = metric.connection_type.clone();
        record.created_at = metric.timestamp;

        match metric.metric_type {
            MetricType::Lcp => record.lcp = Some(metric.value),
            MetricType::Fid => record.fid = Some(metric.value),
            MetricType::Cls => record.cls = Some(metric.value),
            MetricType::Fcp => record.fcp = Some(metric.value),
            MetricType::Ttfb => record.ttfb = Some(metric.value),
            MetricType::ApiResponse | MetricType::DatabaseQuery => {}
        }

        let sink = Arc::clone(&self.sink);
        let metric_type = metric.metric_type;
        tokio::spawn(async move {
            match sink.append(&record).await {
                Ok(()) => {}
                // Already reported once at startup.
                Err(e) if e.kind == DatabaseErrorKind::NotConfigured => {
                    debug!(%metric_type, "Performance metric not persisted: {}", e);
                }
                Err(e) => {
                    error!(%metric_type, "Failed to persist performance metric: {}", e);
                }
            }
        });
    }

    async fn check_threshold(&self, metric: &Metric) -> Option<Alert> {
        let threshold = metric.metric_type.thresholds().needs_improvement;
        if metric.value <= threshold {
            return None;
        }

        let alert = Alert {
            alert_id: Uuid::new_v4(),
            kind: AlertKind::PerformanceDegradation,
            metric: metric.metric_type,
            value: metric.value,
            threshold,
            label: metric.label.clone(),
            timestamp: metric.timestamp,
            message: format!(
                "{} ({}) exceeded threshold ({}) on {}",
                metric.metric_type, metric.value, threshold, metric.label
            ),
        };

        warn!(
            alert_id = %alert.alert_id,
            metric = %alert.metric,
            value = alert.value,
            threshold = alert.threshold,
            "Performance alert: {}", alert.message
        );

        if let Some(forwarder) = &self.forwarder {
            if let Err(e) = forwarder.forward(&alert).await {
                error!(alert_id = %alert.alert_id, "Failed to forward performance alert: {}", e);
            }
        }

        Some(alert)
    }
}
