use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use tokio::time::Instant;

use performance_cell::PerformanceMonitor;

// Records every request's round-trip as an API_RESPONSE sample.
pub async fn track_api_performance(
    State(monitor): State<Arc<PerformanceMonitor>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let method = request.method().to_string();
    let endpoint = request.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(request).await;

    let response_time_ms = start.elapsed().as_secs_f64() * 1_000.0;
    let status = response.status();
    let error = status
        .is_server_error()
        .then(|| status.canonical_reason().unwrap_or("server error"));

    monitor
        .record_api_performance(&endpoint, &method, response_time_ms, status.as_u16(), error)
        .await;

    response
}
