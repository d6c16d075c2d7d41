// Cache manager - TTL expiry, LRU eviction and deterministic key hashing
// Author: kelexine (https://github.com/kelexine)

use crate::cache::models::{CacheConfig, CacheEntry, CacheStats};
use crate::error::Result;
use crate::metrics;
use lru::LruCache;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::num::NonZeroUsize;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

struct CacheState<V> {
    entries: LruCache<String, CacheEntry<V>>,
    stats: CacheStats,
}

impl<V> CacheState<V> {
    fn purge_expired(&mut self, now: Instant) -> usize {
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            self.entries.pop(key);
        }
        self.stats.expirations += expired.len() as u64;
        expired.len()
    }
}

/// In-memory key→value store with per-entry TTL and size-bounded LRU eviction.
///
/// All operations complete under a single short lock, so no read-modify-write
/// ever spans an `.await`.
pub struct CacheManager<V> {
    config: CacheConfig,
    state: Arc<Mutex<CacheState<V>>>,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl<V> CacheManager<V>
where
    V: Clone + Send + 'static,
{
    /// Create a new cache manager.
    ///
    /// When called inside a Tokio runtime and a sweep interval is configured,
    /// a background task periodically drops expired entries.
    pub fn new(config: CacheConfig) -> Self {
        let entries = match NonZeroUsize::new(config.max_size) {
            Some(cap) => LruCache::new(cap),
            None => LruCache::unbounded(),
        };
        let state = Arc::new(Mutex::new(CacheState {
            entries,
            stats: CacheStats {
                max_size: config.max_size,
                ..CacheStats::default()
            },
        }));

        // A zero period would make `interval` panic; treat it as "no sweeper"
        let sweep_interval = config.sweep_interval.filter(|interval| !interval.is_zero());
        let sweeper = match (sweep_interval, tokio::runtime::Handle::try_current()) {
            (Some(interval), Ok(handle)) => {
                Some(handle.spawn(Self::sweep_loop(Arc::downgrade(&state), interval)))
            }
            _ => None,
        };

        Self {
            config,
            state,
            sweeper: Mutex::new(sweeper),
        }
    }

    async fn sweep_loop(state: Weak<Mutex<CacheState<V>>>, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        // First tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let Some(strong) = state.upgrade() else {
                break;
            };
            let removed = strong.lock().purge_expired(Instant::now());
            if removed > 0 {
                debug!("Cache sweep removed {} expired entries", removed);
                metrics::record_cache_op_by("expire", removed as u64);
            }
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Look up a live entry, promoting it to most-recently-used.
    pub fn get(&self, key: &str) -> Option<V> {
        let mut state = self.state.lock();
        let now = Instant::now();

        match state.entries.peek(key).map(|entry| entry.is_expired(now)) {
            None => {
                state.stats.misses += 1;
                metrics::record_cache_op("miss");
                return None;
            }
            Some(true) => {
                state.entries.pop(key);
                state.stats.expirations += 1;
                state.stats.misses += 1;
                metrics::record_cache_op("expire");
                metrics::record_cache_op("miss");
                debug!("Cache entry expired: {}", short_key(key));
                return None;
            }
            Some(false) => {}
        }

        state.stats.hits += 1;
        metrics::record_cache_op("hit");
        state.entries.get(key).map(|entry| entry.value.clone())
    }

    /// Store a value. `ttl` falls back to the configured default.
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Option<Duration>) {
        let key = key.into();
        let ttl = ttl.unwrap_or(self.config.default_ttl);
        let mut state = self.state.lock();

        // Make room from expired entries before evicting live ones
        if self.config.max_size > 0
            && state.entries.len() >= self.config.max_size
            && !state.entries.contains(&key)
        {
            let removed = state.purge_expired(Instant::now());
            if removed > 0 {
                metrics::record_cache_op_by("expire", removed as u64);
            }
        }

        let entry = CacheEntry::new(key.clone(), value, ttl);
        if let Some((evicted_key, _)) = state.entries.push(key.clone(), entry) {
            if evicted_key != key {
                state.stats.evictions += 1;
                metrics::record_cache_op("evict");
                debug!("Cache evicted LRU entry: {}", short_key(&evicted_key));
            }
        }
        state.stats.sets += 1;
        metrics::record_cache_op("set");
        metrics::update_cache_entries(state.entries.len());
    }

    /// Remove every entry whose TTL has elapsed; returns how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let removed = self.state.lock().purge_expired(Instant::now());
        if removed > 0 {
            metrics::record_cache_op_by("expire", removed as u64);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        let state = self.state.lock();
        CacheStats {
            size: state.entries.len(),
            ..state.stats.clone()
        }
    }

    /// Clear all cached entries
    pub fn clear(&self) {
        self.state.lock().entries.clear();
        metrics::update_cache_entries(0);
        debug!("Cache cleared");
    }

    /// Stop the background sweeper. Safe to call more than once.
    pub fn destroy(&self) {
        if let Some(handle) = self.sweeper.lock().take() {
            handle.abort();
            debug!("Cache sweeper stopped");
        }
    }

    /// Whether the background sweeper is still scheduled.
    pub fn is_sweeping(&self) -> bool {
        self.sweeper
            .lock()
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }
}

impl<V> CacheManager<V> {
    /// Derive a deterministic SHA256 key from a namespace and a payload.
    ///
    /// The payload is serialized canonically (object keys sorted at every
    /// depth), so logically equal requests hash identically regardless of
    /// field order.
    pub fn create_hash_key<P: Serialize + ?Sized>(namespace: &str, payload: &P) -> Result<String> {
        let value = serde_json::to_value(payload)?;
        let mut canonical = String::new();
        write_canonical(&value, &mut canonical)?;

        let mut hasher = Sha256::new();
        hasher.update(namespace.as_bytes());
        hasher.update(b":");
        hasher.update(canonical.as_bytes());

        Ok(format!("{}:{:x}", namespace, hasher.finalize()))
    }
}

impl<V> Drop for CacheManager<V> {
    fn drop(&mut self) {
        if let Some(handle) = self.sweeper.get_mut().take() {
            handle.abort();
        }
    }
}

fn write_canonical(value: &Value, out: &mut String) -> Result<()> {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&serde_json::to_string(key)?);
                out.push(':');
                write_canonical(&map[key], out)?;
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out)?;
            }
            out.push(']');
        }
        scalar => out.push_str(&serde_json::to_string(scalar)?),
    }
    Ok(())
}

fn short_key(key: &str) -> &str {
    let end = key
        .char_indices()
        .nth(24)
        .map(|(idx, _)| idx)
        .unwrap_or(key.len());
    &key[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn manager(max_size: usize, ttl_ms: u64) -> CacheManager<String> {
        CacheManager::new(CacheConfig {
            enabled: true,
            default_ttl: Duration::from_millis(ttl_ms),
            max_size,
            sweep_interval: None,
        })
    }

    #[test]
    fn test_cache_key_ignores_field_order() {
        let a = json!({"model": "gemini", "config": {"temperature": 0.5, "topK": 3}});
        let b = json!({"config": {"topK": 3, "temperature": 0.5}, "model": "gemini"});

        let key_a = CacheManager::<String>::create_hash_key("generate", &a).unwrap();
        let key_b = CacheManager::<String>::create_hash_key("generate", &b).unwrap();
        assert_eq!(key_a, key_b);

        // Different namespace should produce different key
        let key_c = CacheManager::<String>::create_hash_key("stream", &a).unwrap();
        assert_ne!(key_a, key_c);
    }

    #[test]
    fn test_canonical_form() {
        let mut out = String::new();
        write_canonical(&json!({"b": [1, {"d": 1, "c": 2}], "a": "x"}), &mut out).unwrap();
        assert_eq!(out, r#"{"a":"x","b":[1,{"c":2,"d":1}]}"#);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_after_ttl() {
        let cache = manager(10, 1000);
        cache.set("k", "v".to_string(), None);

        tokio::time::advance(Duration::from_millis(500)).await;
        assert_eq!(cache.get("k").as_deref(), Some("v"));

        tokio::time::advance(Duration::from_millis(501)).await;
        assert_eq!(cache.get("k"), None);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.expirations, 1);
        assert_eq!(stats.size, 0);
    }

    #[test]
    fn test_lru_eviction_order() {
        let cache = manager(2, 60_000);
        cache.set("a", "1".to_string(), None);
        cache.set("b", "2".to_string(), None);

        // Touch "a" so "b" becomes least recently used
        assert!(cache.get("a").is_some());
        cache.set("c", "3".to_string(), None);

        assert!(cache.get("a").is_some());
        assert!(cache.get("b").is_none());
        assert!(cache.get("c").is_some());
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_overwrite_is_not_eviction() {
        let cache = manager(2, 60_000);
        cache.set("a", "1".to_string(), None);
        cache.set("a", "2".to_string(), None);
        assert_eq!(cache.get("a").as_deref(), Some("2"));
        assert_eq!(cache.stats().evictions, 0);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entries_make_room_before_eviction() {
        let cache = manager(2, 60_000);
        cache.set("short", "x".to_string(), Some(Duration::from_millis(10)));
        cache.set("long", "y".to_string(), None);

        tokio::time::advance(Duration::from_millis(20)).await;
        cache.set("new", "z".to_string(), None);

        let stats = cache.stats();
        assert_eq!(stats.evictions, 0);
        assert_eq!(stats.expirations, 1);
        assert!(cache.get("long").is_some());
    }

    #[tokio::test]
    async fn test_zero_sweep_interval_disables_sweeper() {
        let cache: CacheManager<u32> = CacheManager::new(CacheConfig {
            sweep_interval: Some(Duration::ZERO),
            ..CacheConfig::default()
        });
        assert!(!cache.is_sweeping());
        cache.set("a", 1, None);
        assert_eq!(cache.get("a"), Some(1));
    }
}
