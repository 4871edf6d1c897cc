// =====================================================================================
// RESILIENCE CELL - RETRY & CONNECTION HEALTH
// =====================================================================================
//
// Wraps calls to the datastore client with:
// - Exponential backoff with jitter for transient failures
// - Immediate propagation of integrity violations (never retried)
// - A timed health probe reporting the configured pool ceiling
//
// =====================================================================================

pub mod models;
pub mod services;

pub use models::{ConnectionHealth, RetryPolicy};
pub use services::{retry_with_backoff, ConnectionManager, Retryable};
