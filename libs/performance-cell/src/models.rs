use std::collections::BTreeMap;
use std::fmt;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =====================================================================================
// METRIC TYPES & THRESHOLDS
// =====================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MetricType {
    /// Largest Contentful Paint
    Lcp,
    /// First Input Delay
    Fid,
    /// Cumulative Layout Shift
    Cls,
    /// First Contentful Paint
    Fcp,
    /// Time to First Byte
    Ttfb,
    ApiResponse,
    DatabaseQuery,
}

impl MetricType {
    pub const ALL: [MetricType; 7] = [
        MetricType::Lcp,
        MetricType::Fid,
        MetricType::Cls,
        MetricType::Fcp,
        MetricType::Ttfb,
        MetricType::ApiResponse,
        MetricType::DatabaseQuery,
    ];

    pub fn thresholds(&self) -> ThresholdPair {
        match self {
            MetricType::Lcp => ThresholdPair::new(2_500.0, 4_000.0),
            MetricType::Fid => ThresholdPair::new(100.0, 300.0),
            MetricType::Cls => ThresholdPair::new(0.1, 0.25),
            MetricType::Fcp => ThresholdPair::new(1_800.0, 3_000.0),
            MetricType::Ttfb => ThresholdPair::new(800.0, 1_800.0),
            MetricType::ApiResponse => ThresholdPair::new(200.0, 1_000.0),
            MetricType::DatabaseQuery => ThresholdPair::new(100.0, 500.0),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricType::Lcp => "LCP",
            MetricType::Fid => "FID",
            MetricType::Cls => "CLS",
            MetricType::Fcp => "FCP",
            MetricType::Ttfb => "TTFB",
            MetricType::ApiResponse => "API_RESPONSE",
            MetricType::DatabaseQuery => "DATABASE_QUERY",
        }
    }
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ThresholdPair {
    pub good: f64,
    pub needs_improvement: f64,
}

impl ThresholdPair {
    pub const fn new(good: f64, needs_improvement: f64) -> Self {
        Self { good, needs_improvement }
    }
}

// =====================================================================================
// SAMPLES & ALERTS
// =====================================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    #[serde(rename = "type")]
    pub metric_type: MetricType,
    pub value: f64,
    /// Endpoint, page or query identifier.
    pub label: String,
    pub timestamp: DateTime<Utc>,
    pub session_id: Option<String>,
    pub connection_type: Option<String>,
    pub user_agent: Option<String>,
}

impl Metric {
    pub fn new(metric_type: MetricType, value: f64, label: impl Into<String>) -> Self {
        Self {
            metric_type,
            value,
            label: label.into(),
            timestamp: Utc::now(),
            session_id: None,
            connection_type: None,
            user_agent: None,
        }
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    /// A single sample crossed its threshold.
    PerformanceDegradation,
    /// A windowed p95 crossed its threshold.
    Performance,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    pub alert_id: Uuid,
    pub kind: AlertKind,
    pub metric: MetricType,
    pub value: f64,
    pub threshold: f64,
    pub label: String,
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

// =====================================================================================
// AGGREGATES & SCORES
// =====================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Aggregate {
    pub avg: f64,
    pub p95: f64,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct PerformanceSummary {
    pub metrics: BTreeMap<MetricType, Aggregate>,
    pub alerts: Vec<Alert>,
}

/// Ordered from best to worst so `max` picks the worst rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Rating {
    Good,
    NeedsImprovement,
    Poor,
}

impl Rating {
    pub fn classify(value: f64, thresholds: ThresholdPair) -> Self {
        if value <= thresholds.good {
            Rating::Good
        } else if value <= thresholds.needs_improvement {
            Rating::NeedsImprovement
        } else {
            Rating::Poor
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CoreWebVitalsScore {
    pub lcp: Rating,
    pub fid: Rating,
    pub cls: Rating,
    pub overall: Rating,
}

#[derive(Debug, Clone, Serialize)]
pub struct SystemHealthSnapshot {
    pub timestamp: DateTime<Utc>,
    /// Used / total system memory, 0..=1.
    pub memory_usage: Option<f64>,
    pub database_response_time_ms: Option<u64>,
}

// =====================================================================================
// REQUEST / RESPONSE DTOs
// =====================================================================================

/// Page-load signal reported by the browser.
#[derive(Debug, Deserialize)]
pub struct ReportMetricRequest {
    #[serde(rename = "type")]
    pub metric_type: MetricType,
    pub value: f64,
    pub page: String,
    pub session_id: Option<String>,
    pub connection_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReportMetricResponse {
    pub recorded: bool,
    pub alert: Option<Alert>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SummaryQuery {
    pub time_range_ms: Option<u64>,
}

#[derive(Debug, thiserror::Error)]
pub enum PerformanceError {
    #[error("Invalid metric: {0}")]
    InvalidMetric(String),
    #[error("Time range must be greater than zero")]
    InvalidTimeRange,
}
