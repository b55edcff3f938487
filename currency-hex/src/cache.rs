//! Rate caching with TTL support.
//!
//! Entries are visible only while `now < expires_at`. Expired entries are
//! dropped lazily on read, or in bulk when the cache is full.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use currency_types::{CurrencyCode, RateSnapshot};
use dashmap::DashMap;
use rust_decimal::Decimal;
use tokio::time::{Duration, Instant};
use tracing::debug;

/// Cache key for a base currency's latest snapshot.
pub fn latest_key(base: &CurrencyCode) -> String {
    format!("latest:{}", base)
}

/// Cache key for a single derived exchange rate.
pub fn pair_key(from: &CurrencyCode, to: &CurrencyCode) -> String {
    format!("pair:{}:{}", from, to)
}

/// A cached value: a full snapshot or one derived rate.
#[derive(Debug, Clone, PartialEq)]
pub enum CachedValue {
    Snapshot(Arc<RateSnapshot>),
    Rate(Decimal),
}

#[derive(Debug)]
struct CacheEntry {
    value: CachedValue,
    expires_at: Instant,
    /// Insertion order, used to evict the oldest entry on overflow.
    seq: u64,
}

impl CacheEntry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Configuration for the rate cache.
#[derive(Debug, Clone)]
pub struct RateCacheConfig {
    /// TTL applied by [`RateCache::put`].
    pub ttl: Duration,
    /// Maximum number of entries before eviction kicks in.
    pub max_entries: usize,
}

impl Default for RateCacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(60 * 60),
            max_entries: 10_000,
        }
    }
}

/// Thread-safe rate cache with TTL.
///
/// Backed by a sharded map, so reads and writes for different keys do not
/// contend on a single lock.
#[derive(Debug)]
pub struct RateCache {
    entries: DashMap<String, CacheEntry>,
    config: RateCacheConfig,
    next_seq: AtomicU64,
}

impl RateCache {
    /// Create a new rate cache with default configuration.
    pub fn new() -> Self {
        Self::with_config(RateCacheConfig::default())
    }

    /// Create a new rate cache with custom configuration.
    pub fn with_config(config: RateCacheConfig) -> Self {
        Self {
            entries: DashMap::new(),
            config,
            next_seq: AtomicU64::new(0),
        }
    }

    /// Get a value if present and not expired.
    pub fn get(&self, key: &str) -> Option<CachedValue> {
        let now = Instant::now();

        if let Some(entry) = self.entries.get(key) {
            if entry.is_live(now) {
                debug!(key, "cache hit");
                return Some(entry.value.clone());
            }
            drop(entry);
            debug!(key, "cache entry expired");
            // Re-check under the write lock: a fresh value may have landed meanwhile.
            self.entries.remove_if(key, |_, e| !e.is_live(now));
        }

        debug!(key, "cache miss");
        None
    }

    /// Get a cached snapshot. Returns `None` if the key holds a scalar rate.
    pub fn get_snapshot(&self, key: &str) -> Option<Arc<RateSnapshot>> {
        match self.get(key)? {
            CachedValue::Snapshot(snapshot) => Some(snapshot),
            CachedValue::Rate(_) => None,
        }
    }

    /// Get a cached scalar rate. Returns `None` if the key holds a snapshot.
    pub fn get_rate(&self, key: &str) -> Option<Decimal> {
        match self.get(key)? {
            CachedValue::Rate(rate) => Some(rate),
            CachedValue::Snapshot(_) => None,
        }
    }

    /// Insert a value with the configured TTL.
    pub fn put(&self, key: impl Into<String>, value: CachedValue) {
        self.put_with_ttl(key, value, self.config.ttl);
    }

    /// Insert a value with a custom TTL, replacing any previous entry.
    pub fn put_with_ttl(&self, key: impl Into<String>, value: CachedValue, ttl: Duration) {
        let key = key.into();
        let now = Instant::now();

        if !self.entries.contains_key(&key) && self.entries.len() >= self.config.max_entries {
            self.make_room(now);
        }

        let entry = CacheEntry {
            value,
            expires_at: now + ttl,
            seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
        };
        self.entries.insert(key, entry);
    }

    /// Remove every entry.
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Number of stored entries, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every expired entry.
    pub fn evict_expired(&self) {
        let now = Instant::now();
        self.entries.retain(|_, entry| entry.is_live(now));
    }

    fn make_room(&self, now: Instant) {
        self.entries.retain(|_, entry| entry.is_live(now));
        if self.entries.len() < self.config.max_entries {
            return;
        }

        let oldest = self
            .entries
            .iter()
            .min_by_key(|entry| entry.seq)
            .map(|entry| entry.key().clone());
        if let Some(key) = oldest {
            debug!(key = %key, "evicting oldest cache entry");
            self.entries.remove(&key);
        }
    }
}

impl Default for RateCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use std::collections::BTreeMap;

    fn code(raw: &str) -> CurrencyCode {
        CurrencyCode::parse(raw).unwrap()
    }

    fn snapshot(base: &str) -> Arc<RateSnapshot> {
        Arc::new(RateSnapshot {
            base_currency: code(base),
            as_of: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            rates: BTreeMap::from([("GBP".to_string(), dec!(0.79))]),
        })
    }

    #[test]
    fn test_keys_are_uppercase() {
        assert_eq!(latest_key(&code("eur")), "latest:EUR");
        assert_eq!(pair_key(&code("usd"), &code("gbp")), "pair:USD:GBP");
    }

    #[tokio::test(start_paused = true)]
    async fn test_put_and_get() {
        let cache = RateCache::new();
        cache.put("latest:USD", CachedValue::Snapshot(snapshot("USD")));
        cache.put("pair:USD:GBP", CachedValue::Rate(dec!(0.79)));

        assert_eq!(cache.get_snapshot("latest:USD"), Some(snapshot("USD")));
        assert_eq!(cache.get_rate("pair:USD:GBP"), Some(dec!(0.79)));
        assert_eq!(cache.get("latest:EUR"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_typed_getters_ignore_other_kind() {
        let cache = RateCache::new();
        cache.put("k", CachedValue::Rate(dec!(1.5)));
        assert_eq!(cache.get_snapshot("k"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_after_ttl() {
        let cache = RateCache::new();
        cache.put("pair:USD:GBP", CachedValue::Rate(dec!(0.79)));

        tokio::time::advance(Duration::from_secs(59 * 60)).await;
        assert_eq!(cache.get_rate("pair:USD:GBP"), Some(dec!(0.79)));

        tokio::time::advance(Duration::from_secs(60)).await;
        assert_eq!(cache.get_rate("pair:USD:GBP"), None);
        assert!(cache.is_empty(), "expired entry is removed on read");
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_ttl() {
        let cache = RateCache::new();
        cache.put_with_ttl("k", CachedValue::Rate(dec!(2)), Duration::from_secs(5));
        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(cache.get("k"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overflow_evicts_oldest_inserted() {
        let cache = RateCache::with_config(RateCacheConfig {
            ttl: Duration::from_secs(3600),
            max_entries: 3,
        });
        for (i, key) in ["a", "b", "c"].iter().enumerate() {
            cache.put(*key, CachedValue::Rate(Decimal::from(i)));
        }

        cache.put("d", CachedValue::Rate(dec!(3)));

        assert_eq!(cache.len(), 3);
        assert_eq!(cache.get("a"), None);
        assert!(cache.get("b").is_some());
        assert!(cache.get("d").is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_overflow_prefers_expired_entries() {
        let cache = RateCache::with_config(RateCacheConfig {
            ttl: Duration::from_secs(3600),
            max_entries: 2,
        });
        cache.put("old", CachedValue::Rate(dec!(1)));
        cache.put_with_ttl("short", CachedValue::Rate(dec!(2)), Duration::from_secs(1));
        tokio::time::advance(Duration::from_secs(2)).await;

        cache.put("new", CachedValue::Rate(dec!(3)));

        assert!(cache.get("old").is_some());
        assert!(cache.get("new").is_some());
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overwrite_at_capacity_does_not_evict() {
        let cache = RateCache::with_config(RateCacheConfig {
            ttl: Duration::from_secs(3600),
            max_entries: 2,
        });
        cache.put("a", CachedValue::Rate(dec!(1)));
        cache.put("b", CachedValue::Rate(dec!(2)));

        cache.put("a", CachedValue::Rate(dec!(10)));

        assert_eq!(cache.get_rate("a"), Some(dec!(10)));
        assert_eq!(cache.get_rate("b"), Some(dec!(2)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_evict_expired_and_clear() {
        let cache = RateCache::new();
        cache.put_with_ttl("short", CachedValue::Rate(dec!(1)), Duration::from_secs(1));
        cache.put("long", CachedValue::Rate(dec!(2)));
        tokio::time::advance(Duration::from_secs(2)).await;

        cache.evict_expired();
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_writers_different_keys() {
        let cache = Arc::new(RateCache::new());
        let handles: Vec<_> = (0..16)
            .map(|i| {
                let cache = cache.clone();
                tokio::spawn(async move {
                    cache.put(format!("pair:K{i}"), CachedValue::Rate(Decimal::from(i)));
                    cache.get_rate(&format!("pair:K{i}"))
                })
            })
            .collect();

        for (i, handle) in handles.into_iter().enumerate() {
            assert_eq!(handle.await.unwrap(), Some(Decimal::from(i)));
        }
        assert_eq!(cache.len(), 16);
    }
}
