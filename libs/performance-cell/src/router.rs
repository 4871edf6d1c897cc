use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::handlers::{get_core_web_vitals, get_performance_summary, report_metric, PerformanceHandlers};
use crate::services::PerformanceMonitor;

pub fn create_performance_router(monitor: Arc<PerformanceMonitor>) -> Router {
    let handlers = Arc::new(PerformanceHandlers::new(monitor));

    Router::new()
        .route("/metrics", post(report_metric))
        .route("/summary", get(get_performance_summary))
        .route("/vitals", get(get_core_web_vitals))
        .with_state(handlers)
}
