use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    routing::get,
    Json, Router,
};
use serde_json::Value;

use cache_cell::{BoundedTtlCache, CacheStats};
use performance_cell::{create_performance_router, PerformanceMonitor};
use resilience_cell::{ConnectionHealth, ConnectionManager};

use crate::middleware::track_api_performance;

/// Process-wide components, constructed once in `main` and shared by handle.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<BoundedTtlCache<Value>>,
    pub connections: Arc<ConnectionManager>,
    pub monitor: Arc<PerformanceMonitor>,
}

pub fn create_router(state: AppState) -> Router {
    let monitor = state.monitor.clone();

    Router::new()
        .route("/", get(|| async { "Folio API is running!" }))
        .route("/health", get(connection_health))
        .route("/cache/stats", get(cache_stats))
        .with_state(state)
        .nest("/performance", create_performance_router(monitor.clone()))
        .layer(middleware::from_fn_with_state(monitor, track_api_performance))
}

async fn connection_health(State(state): State<AppState>) -> (StatusCode, Json<ConnectionHealth>) {
    let health = state.connections.get_connection_health().await;
    let status = if health.is_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(health))
}

async fn cache_stats(State(state): State<AppState>) -> Json<CacheStats> {
    Json(state.cache.stats().await)
}
