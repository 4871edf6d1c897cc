use std::collections::{BTreeMap, HashMap};
use std::fmt::Display;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use regex::Regex;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::models::{CacheEntry, CacheStats};

pub const DEFAULT_MAX_SIZE: usize = 1_000;

struct CacheState<V> {
    entries: HashMap<String, CacheEntry<V>>,
    // sequence -> key, oldest insertion first
    order: BTreeMap<u64, String>,
    next_sequence: u64,
}

impl<V> CacheState<V> {
    fn new() -> Self {
        Self {
            entries: HashMap::new(),
            order: BTreeMap::new(),
            next_sequence: 0,
        }
    }

    fn remove(&mut self, key: &str) -> Option<CacheEntry<V>> {
        let entry = self.entries.remove(key)?;
        self.order.remove(&entry.sequence);
        Some(entry)
    }

    fn purge_expired(&mut self, now: Instant) -> usize {
        let expired: Vec<String> = self.entries.iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            self.remove(key);
        }

        expired.len()
    }

    fn evict_oldest(&mut self) -> Option<String> {
        let (_, key) = self.order.pop_first()?;
        self.entries.remove(&key);
        Some(key)
    }

    /// Returns the live entry for `key`, dropping it first if it has expired.
    fn live_entry(&mut self, key: &str, now: Instant) -> Option<&CacheEntry<V>> {
        if self.entries.get(key)?.is_expired(now) {
            self.remove(key);
            return None;
        }
        self.entries.get(key)
    }
}

/// Process-local key/value cache with per-entry expiry and a hard size ceiling.
///
/// When full, expired entries are purged first; if that frees nothing, the
/// earliest-inserted key is evicted (FIFO, not LRU). Reads do not refresh an
/// entry's position.
///
/// `get_cached_or_fetch` is plain cache-aside with no single-flight: two tasks
/// missing the same key concurrently will both run their fetch, and the last
/// one to finish wins the slot.
pub struct BoundedTtlCache<V> {
    state: RwLock<CacheState<V>>,
    max_size: usize,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<V> Default for BoundedTtlCache<V>
where
    V: Clone + Send + Sync,
{
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SIZE)
    }
}

impl<V> BoundedTtlCache<V>
where
    V: Clone + Send + Sync,
{
    pub fn new(max_size: usize) -> Self {
        Self {
            state: RwLock::new(CacheState::new()),
            max_size: max_size.max(1),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    #[instrument(skip(self, value))]
    pub async fn set(&self, key: &str, value: V, ttl: Duration) {
        let now = Instant::now();
        let mut state = self.state.write().await;

        // Overwrites keep their original insertion position and never evict.
        if let Some(entry) = state.entries.get_mut(key) {
            entry.value = value;
            entry.expiry = expiry_after(now, ttl);
            entry.stored_at = now;
            return;
        }

        if state.entries.len() >= self.max_size {
            let purged = state.purge_expired(now);
            if purged > 0 {
                debug!("Cache purged {} expired entries", purged);
            }

            if state.entries.len() >= self.max_size {
                if let Some(evicted) = state.evict_oldest() {
                    debug!("Cache full, evicted oldest key={}", evicted);
                }
            }
        }

        let sequence = state.next_sequence;
        state.next_sequence += 1;
        state.order.insert(sequence, key.to_string());
        state.entries.insert(key.to_string(), CacheEntry {
            value,
            expiry: expiry_after(now, ttl),
            stored_at: now,
            sequence,
        });
    }

    pub async fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        let mut state = self.state.write().await;

        match state.live_entry(key, now) {
            Some(entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.value.clone())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Same expiry semantics as `get`, without touching the counters.
    pub async fn has(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut state = self.state.write().await;
        state.live_entry(key, now).is_some()
    }

    pub async fn delete(&self, key: &str) -> bool {
        let mut state = self.state.write().await;
        state.remove(key).is_some()
    }

    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        state.entries.clear();
        state.order.clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }

    pub async fn stats(&self) -> CacheStats {
        let state = self.state.read().await;
        CacheStats {
            size: state.entries.len(),
            max_size: self.max_size,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    /// Unexpired keys, oldest insertion first.
    pub async fn keys(&self) -> Vec<String> {
        let now = Instant::now();
        let state = self.state.read().await;
        state.order.values()
            .filter(|key| state.entries.get(*key).is_some_and(|entry| !entry.is_expired(now)))
            .cloned()
            .collect()
    }

    /// Returns the cached value on a hit without calling `fetch`. On a miss the
    /// fetched value is stored under `key`; a failed fetch caches nothing and
    /// its error is returned as-is.
    pub async fn get_cached_or_fetch<F, Fut, E>(&self, key: &str, fetch: F, ttl: Duration) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(cached) = self.get(key).await {
            return Ok(cached);
        }

        let value = fetch().await?;
        self.set(key, value.clone(), ttl).await;
        Ok(value)
    }

    /// Pre-populates `key`. Failures are logged, never returned.
    pub async fn warm<F, Fut, E>(&self, key: &str, fetch: F, ttl: Duration) -> bool
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
        E: Display,
    {
        match self.get_cached_or_fetch(key, fetch, ttl).await {
            Ok(_) => true,
            Err(e) => {
                warn!("Cache warming failed for key={}: {}", key, e);
                false
            }
        }
    }

    pub async fn batch_get(&self, keys: &[&str]) -> HashMap<String, Option<V>> {
        let mut results = HashMap::with_capacity(keys.len());
        for key in keys {
            results.insert(key.to_string(), self.get(key).await);
        }
        results
    }

    pub async fn batch_set(&self, items: Vec<(String, V, Duration)>) {
        for (key, value, ttl) in items {
            self.set(&key, value, ttl).await;
        }
    }

    /// Deletes every key matching a `*` glob. `None` or an empty pattern
    /// clears the whole cache.
    pub async fn invalidate_matching(&self, pattern: Option<&str>) -> usize {
        let pattern = match pattern {
            Some(p) if !p.is_empty() => p,
            _ => {
                let size = self.state.read().await.entries.len();
                self.clear().await;
                info!("Cache cleared ({} entries)", size);
                return size;
            }
        };

        let regex = match glob_to_regex(pattern) {
            Ok(regex) => regex,
            Err(e) => {
                warn!("Invalid cache invalidation pattern {:?}: {}", pattern, e);
                return 0;
            }
        };

        let mut state = self.state.write().await;
        let matching: Vec<String> = state.entries.keys()
            .filter(|key| regex.is_match(key))
            .cloned()
            .collect();

        for key in &matching {
            state.remove(key);
        }

        debug!("Invalidated {} cache entries matching {:?}", matching.len(), pattern);
        matching.len()
    }
}

impl<V> BoundedTtlCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Serves fresh entries directly. Entries older than `stale_after` but not
    /// yet expired are served immediately while a background task refreshes
    /// them. Anything else is fetched inline and stored for `revalidate_ttl`.
    pub async fn stale_while_revalidate<F, Fut, E>(
        self: &Arc<Self>,
        key: &str,
        fetch: F,
        stale_after: Duration,
        revalidate_ttl: Duration,
    ) -> Result<V, E>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        let now = Instant::now();
        let cached = {
            let mut state = self.state.write().await;
            state.live_entry(key, now).map(|entry| (entry.value.clone(), entry.age(now)))
        };

        if let Some((value, age)) = cached {
            self.hits.fetch_add(1, Ordering::Relaxed);
            if age < stale_after {
                return Ok(value);
            }

            let cache = Arc::clone(self);
            let key = key.to_string();
            tokio::spawn(async move {
                match fetch().await {
                    Ok(fresh) => cache.set(&key, fresh, revalidate_ttl).await,
                    Err(e) => warn!("Background revalidation failed for key={}: {}", key, e),
                }
            });

            return Ok(value);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let fresh = fetch().await?;
        self.set(key, fresh.clone(), revalidate_ttl).await;
        Ok(fresh)
    }
}

// Longest TTL honoured; anything larger is capped here.
const MAX_TTL: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

fn expiry_after(now: Instant, ttl: Duration) -> Instant {
    now.checked_add(ttl.min(MAX_TTL)).unwrap_or(now)
}

fn glob_to_regex(pattern: &str) -> Result<Regex, regex::Error> {
    let escaped: Vec<String> = pattern.split('*').map(regex::escape).collect();
    Regex::new(&format!("^{}$", escaped.join(".*")))
}
