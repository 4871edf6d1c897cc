// =====================================================================================
// CACHE CELL - BOUNDED IN-MEMORY TTL CACHE
// =====================================================================================
//
// Process-local cache used to avoid redundant queries and recomputation:
// - Per-entry expiry with a hard size ceiling (FIFO eviction)
// - Cache-aside fetch, warming and stale-while-revalidate helpers
// - Hit/miss counters and glob-based invalidation
//
// =====================================================================================

pub mod models;
pub mod services;

pub use models::{CacheDuration, CacheEntry, CacheStats};
pub use services::{cache_key, prefixed_key, BoundedTtlCache, DEFAULT_MAX_SIZE};
