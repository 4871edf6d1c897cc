use axum::{
    extract::{Query, State},
    http::{header::USER_AGENT, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

use crate::models::{
    CoreWebVitalsScore, Metric, PerformanceError, PerformanceSummary, ReportMetricRequest,
    ReportMetricResponse, SummaryQuery,
};
use crate::services::PerformanceMonitor;

const DEFAULT_TIME_RANGE: Duration = Duration::from_secs(3_600);

pub struct PerformanceHandlers {
    monitor: Arc<PerformanceMonitor>,
}

impl PerformanceHandlers {
    pub fn new(monitor: Arc<PerformanceMonitor>) -> Self {
        Self { monitor }
    }
}

fn time_range(query: &SummaryQuery) -> Result<Duration, PerformanceError> {
    match query.time_range_ms {
        None => Ok(DEFAULT_TIME_RANGE),
        Some(0) => Err(PerformanceError::InvalidTimeRange),
        Some(ms) => Ok(Duration::from_millis(ms)),
    }
}

#[instrument(skip(handlers, headers, request))]
pub async fn report_metric(
    State(handlers): State<Arc<PerformanceHandlers>>,
    headers: HeaderMap,
    Json(request): Json<ReportMetricRequest>,
) -> Result<(StatusCode, Json<ReportMetricResponse>), PerformanceError> {
    if !request.value.is_finite() || request.value < 0.0 {
        return Err(PerformanceError::InvalidMetric(format!(
            "value must be a non-negative number, got {}",
            request.value
        )));
    }

    if request.page.trim().is_empty() {
        return Err(PerformanceError::InvalidMetric("page is required".to_string()));
    }

    let mut metric = Metric::new(request.metric_type, request.value, request.page);
    metric.session_id = request.session_id;
    metric.connection_type = request.connection_type;
    metric.user_agent = headers
        .get(USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    let alert = handlers.monitor.record_metric(metric).await;

    Ok((
        StatusCode::ACCEPTED,
        Json(ReportMetricResponse {
            recorded: true,
            alert,
        }),
    ))
}

pub async fn get_performance_summary(
    State(handlers): State<Arc<PerformanceHandlers>>,
    Query(query): Query<SummaryQuery>,
) -> Result<Json<PerformanceSummary>, PerformanceError> {
    let summary = handlers.monitor.get_performance_summary(time_range(&query)?).await;
    Ok(Json(summary))
}

pub async fn get_core_web_vitals(
    State(handlers): State<Arc<PerformanceHandlers>>,
    Query(query): Query<SummaryQuery>,
) -> Result<Json<CoreWebVitalsScore>, PerformanceError> {
    let summary = handlers.monitor.get_performance_summary(time_range(&query)?).await;
    Ok(Json(PerformanceMonitor::get_core_web_vitals_score(&summary.metrics)))
}

impl IntoResponse for PerformanceError {
    fn into_response(self) -> axum::response::Response {
        let status = match self {
            PerformanceError::InvalidMetric(_) => StatusCode::BAD_REQUEST,
            PerformanceError::InvalidTimeRange => StatusCode::BAD_REQUEST,
        };

        (status, Json(serde_json::json!({
            "error": self.to_string(),
            "timestamp": chrono::Utc::now()
        }))).into_response()
    }
}
