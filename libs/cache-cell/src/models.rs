use std::time::Duration;
use serde::Serialize;
use tokio::time::Instant;

#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub expiry: Instant,
    pub stored_at: Instant,
    // Position in insertion order, used for FIFO eviction.
    pub(crate) sequence: u64,
}

impl<V> CacheEntry<V> {
    pub fn is_expired(&self, now: Instant) -> bool {
        now > self.expiry
    }

    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.stored_at)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub size: usize,
    pub max_size: usize,
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Common TTL presets.
pub struct CacheDuration;

impl CacheDuration {
    pub const SHORT: Duration = Duration::from_secs(60);
    pub const MEDIUM: Duration = Duration::from_secs(300);
    pub const LONG: Duration = Duration::from_secs(3_600);
    pub const VERY_LONG: Duration = Duration::from_secs(86_400);
    pub const GITHUB_DATA: Duration = Duration::from_secs(1_800);
    pub const STATIC_CONTENT: Duration = Duration::from_secs(604_800);
}
