use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use async_trait::async_trait;
use tokio::time::Instant;

use shared_config::AppConfig;
use shared_database::{
    DatabaseError, DatabaseErrorKind, DatabaseProbe, PerformanceRecord, PerformanceSink,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub struct TestConfig {
    pub database_url: String,
    pub max_retries: u32,
    pub retry_base_delay: Duration,
    pub connection_timeout: Duration,
    pub cache_max_size: usize,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            database_url: "http://localhost:54321".to_string(),
            max_retries: 3,
            retry_base_delay: Duration::from_millis(100),
            connection_timeout: Duration::from_secs(5),
            cache_max_size: 100,
        }
    }
}

impl TestConfig {
    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            database_url: self.database_url.clone(),
            database_api_key: "test-anon-key".to_string(),
            max_retries: self.max_retries,
            retry_base_delay: self.retry_base_delay,
            connection_timeout: self.connection_timeout,
            cache_max_size: self.cache_max_size,
            ..AppConfig::default()
        }
    }
}

/// Sink that keeps every appended record in memory, optionally after a delay.
#[derive(Default)]
pub struct MemorySink {
    records: Mutex<Vec<PerformanceRecord>>,
    latency: Duration,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slow(latency: Duration) -> Self {
        Self {
            latency,
            ..Self::default()
        }
    }

    pub fn records(&self) -> Vec<PerformanceRecord> {
        lock(&self.records).clone()
    }
}

#[async_trait]
impl PerformanceSink for MemorySink {
    async fn append(&self, record: &PerformanceRecord) -> Result<(), DatabaseError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        lock(&self.records).push(record.clone());
        Ok(())
    }
}

/// Sink whose every write fails with the given kind.
pub struct FailingSink {
    kind: DatabaseErrorKind,
    attempts: AtomicUsize,
}

impl FailingSink {
    pub fn new(kind: DatabaseErrorKind) -> Self {
        Self {
            kind,
            attempts: AtomicUsize::new(0),
        }
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PerformanceSink for FailingSink {
    async fn append(&self, _record: &PerformanceRecord) -> Result<(), DatabaseError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(DatabaseError::new(self.kind, "connection refused"))
    }
}

/// Probe with a fixed outcome and artificial latency.
pub struct ScriptedProbe {
    healthy: bool,
    latency: Duration,
    calls: AtomicUsize,
}

impl ScriptedProbe {
    pub fn healthy(latency: Duration) -> Self {
        Self {
            healthy: true,
            latency,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(latency: Duration) -> Self {
        Self {
            healthy: false,
            latency,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DatabaseProbe for ScriptedProbe {
    async fn ping(&self) -> Result<(), DatabaseError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.latency).await;

        if self.healthy {
            Ok(())
        } else {
            Err(DatabaseError::new(DatabaseErrorKind::Connection, "connection refused"))
        }
    }
}

/// Operation that fails `failures` times with `kind`, then succeeds with `value`.
/// Records when each invocation happened.
pub struct FlakyOperation<T> {
    failures: usize,
    kind: DatabaseErrorKind,
    value: T,
    invocations: Mutex<Vec<Instant>>,
}

impl<T: Clone> FlakyOperation<T> {
    pub fn new(failures: usize, kind: DatabaseErrorKind, value: T) -> Self {
        Self {
            failures,
            kind,
            value,
            invocations: Mutex::new(Vec::new()),
        }
    }

    pub fn always_failing(kind: DatabaseErrorKind, value: T) -> Self {
        Self::new(usize::MAX, kind, value)
    }

    pub async fn call(&self) -> Result<T, DatabaseError> {
        let attempt = {
            let mut invocations = lock(&self.invocations);
            invocations.push(Instant::now());
            invocations.len()
        };

        if attempt <= self.failures {
            Err(DatabaseError::new(self.kind, format!("attempt {} failed", attempt)))
        } else {
            Ok(self.value.clone())
        }
    }

    pub fn calls(&self) -> usize {
        lock(&self.invocations).len()
    }

    pub fn invocation_times(&self) -> Vec<Instant> {
        lock(&self.invocations).clone()
    }
}
