use async_trait::async_trait;

use crate::error::DatabaseError;
use crate::models::PerformanceRecord;

/// Trivial round-trip against the datastore ("are you alive").
#[async_trait]
pub trait DatabaseProbe: Send + Sync {
    async fn ping(&self) -> Result<(), DatabaseError>;
}

/// Append-only destination for performance samples.
#[async_trait]
pub trait PerformanceSink: Send + Sync {
    async fn append(&self, record: &PerformanceRecord) -> Result<(), DatabaseError>;
}

/// Stand-in wired when no datastore is configured. Every call fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledDatabase;

#[async_trait]
impl DatabaseProbe for DisabledDatabase {
    async fn ping(&self) -> Result<(), DatabaseError> {
        Err(DatabaseError::not_configured())
    }
}

#[async_trait]
impl PerformanceSink for DisabledDatabase {
    async fn append(&self, _record: &PerformanceRecord) -> Result<(), DatabaseError> {
        Err(DatabaseError::not_configured())
    }
}
