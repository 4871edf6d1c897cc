// =====================================================================================
// PERFORMANCE CELL - METRICS AGGREGATION & ALERTING
// =====================================================================================
//
// Collects timed samples (page-load signals, API round-trips, datastore queries):
// - Bounded in-memory window with best-effort persistence to the durable sink
// - Threshold alerts per sample and per windowed p95
// - Core Web Vitals rating
// - Owned, cancellable background housekeeping
//
// =====================================================================================

pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::*;
pub use router::create_performance_router;
pub use services::{measure_execution_time, AlertForwarder, Housekeeping, PerformanceMonitor};
