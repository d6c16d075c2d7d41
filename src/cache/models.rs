//! Cache configuration, entry and statistics models.

// Author: kelexine (https://github.com/kelexine)

use crate::config::CacheSettings;
use serde::Serialize;
use std::time::Duration;
use tokio::time::Instant;

/// Configuration for the response cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Whether caching is enabled.
    pub enabled: bool,
    /// TTL applied when `set` is called without an explicit one.
    pub default_ttl: Duration,
    /// Maximum number of live entries; `0` means unbounded.
    pub max_size: usize,
    /// Interval of the background expiry sweep. `None` relies on access-time expiry only.
    pub sweep_interval: Option<Duration>,
}

impl Default for CacheConfig {
    /// Provides default values for cache configuration.
    ///
    /// - `enabled`: true
    /// - `default_ttl`: 5 minutes
    /// - `max_size`: 100
    /// - `sweep_interval`: 60 seconds
    fn default() -> Self {
        Self {
            enabled: true,
            default_ttl: Duration::from_secs(300),
            max_size: 100,
            sweep_interval: Some(Duration::from_secs(60)),
        }
    }
}

impl From<&CacheSettings> for CacheConfig {
    fn from(settings: &CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            default_ttl: Duration::from_millis(settings.ttl_ms),
            max_size: settings.max_size,
            sweep_interval: (settings.sweep_interval_ms > 0)
                .then(|| Duration::from_millis(settings.sweep_interval_ms)),
        }
    }
}

/// A cached value together with its expiry bookkeeping.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub key: String,
    pub value: V,
    pub created_at: Instant,
    pub ttl: Duration,
}

impl<V> CacheEntry<V> {
    pub fn new(key: String, value: V, ttl: Duration) -> Self {
        Self {
            key,
            value,
            created_at: Instant::now(),
            ttl,
        }
    }

    /// An entry is expired once `now - created_at > ttl`.
    pub fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.created_at) > self.ttl
    }
}

/// Statistics for cache operations.
#[derive(Debug, Default, Clone, Serialize, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of lookups served from the cache.
    pub hits: u64,
    /// Number of lookups that found nothing (or an expired entry).
    pub misses: u64,
    /// Number of values written.
    pub sets: u64,
    /// Entries dropped to honor `max_size`.
    pub evictions: u64,
    /// Entries dropped because their TTL elapsed.
    pub expirations: u64,
    /// Current number of stored entries.
    pub size: usize,
    pub max_size: usize,
}
