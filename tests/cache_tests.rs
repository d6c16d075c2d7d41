// Cache manager tests - public API only
// Author: kelexine (https://github.com/kelexine)

use gemguard::cache::{CacheConfig, CacheManager};
use proptest::prelude::*;
use serde_json::json;
use std::time::Duration;

fn config(ttl_ms: u64, max_size: usize) -> CacheConfig {
    CacheConfig {
        enabled: true,
        default_ttl: Duration::from_millis(ttl_ms),
        max_size,
        sweep_interval: None,
    }
}

#[tokio::test]
async fn test_cache_stats_initialization() {
    let cache: CacheManager<String> = CacheManager::new(CacheConfig::default());
    let stats = cache.stats();

    assert_eq!(stats.hits, 0);
    assert_eq!(stats.misses, 0);
    assert_eq!(stats.sets, 0);
    assert_eq!(stats.max_size, 100);
}

#[test]
fn test_cache_config_defaults() {
    let config = CacheConfig::default();

    assert_eq!(config.default_ttl, Duration::from_secs(300));
    assert_eq!(config.max_size, 100);
    assert!(config.enabled); // Should be enabled by default
}

#[tokio::test(start_paused = true)]
async fn test_per_entry_ttl_overrides_default() {
    let cache = CacheManager::new(config(10_000, 10));
    cache.set("short", 1u32, Some(Duration::from_millis(100)));
    cache.set("long", 2u32, None);

    tokio::time::advance(Duration::from_millis(150)).await;
    assert_eq!(cache.get("short"), None);
    assert_eq!(cache.get("long"), Some(2));
    assert_eq!(cache.stats().expirations, 1);
}

#[tokio::test(start_paused = true)]
async fn test_background_sweep_removes_expired() {
    let cache = CacheManager::new(CacheConfig {
        sweep_interval: Some(Duration::from_millis(50)),
        ..config(100, 10)
    });
    assert!(cache.is_sweeping());
    cache.set("a", "x".to_string(), None);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(cache.is_empty());

    cache.destroy();
    cache.destroy();
    assert!(!cache.is_sweeping());
}

#[tokio::test]
async fn test_lru_bound_respected() {
    let cache = CacheManager::new(config(60_000, 2));
    cache.set("a", 1, None);
    cache.set("b", 2, None);
    assert_eq!(cache.get("a"), Some(1));
    cache.set("c", 3, None);

    assert_eq!(cache.len(), 2);
    assert_eq!(cache.get("b"), None);
    assert_eq!(cache.get("a"), Some(1));
    assert_eq!(cache.stats().evictions, 1);

    cache.clear();
    assert!(cache.is_empty());
}

#[test]
fn test_hash_key_format() {
    let key = CacheManager::<()>::create_hash_key("generate", &json!({"prompt": "hi"})).unwrap();
    let (namespace, digest) = key.split_once(':').unwrap();
    assert_eq!(namespace, "generate");
    assert_eq!(digest.len(), 64);
    assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
}

proptest! {
    #[test]
    fn hash_key_independent_of_insertion_order(
        entries in proptest::collection::btree_map("[a-z]{1,8}", any::<i64>(), 1..12),
    ) {
        let forward: serde_json::Map<String, serde_json::Value> =
            entries.iter().map(|(k, v)| (k.clone(), json!(v))).collect();
        let reversed: serde_json::Map<String, serde_json::Value> =
            entries.iter().rev().map(|(k, v)| (k.clone(), json!(v))).collect();

        let a = CacheManager::<()>::create_hash_key("ns", &json!({"options": forward})).unwrap();
        let b = CacheManager::<()>::create_hash_key("ns", &json!({"options": reversed})).unwrap();
        prop_assert_eq!(a, b);
    }
}
