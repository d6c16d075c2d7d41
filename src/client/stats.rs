// Client statistics snapshot
// Author: kelexine (https://github.com/kelexine)

use crate::cache::CacheStats;
use crate::config::{AppConfig, RetryConfig};
use crate::limiter::GateStatus;
use serde::Serialize;

/// Combined view returned by `GenerativeClient::stats`.
#[derive(Debug, Clone, Serialize)]
pub struct ClientStats {
    pub cache: CacheStats,
    pub rate_limiter: GateStatus,
    pub config: ConfigSnapshot,
}

/// Active configuration, minus credentials.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigSnapshot {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_k: u32,
    pub top_p: f32,
    pub timeout_ms: u64,
    pub cache_enabled: bool,
    pub cache_ttl_ms: u64,
    pub cache_max_size: usize,
    pub concurrency: usize,
    pub retry: RetryConfig,
}

impl From<&AppConfig> for ConfigSnapshot {
    fn from(config: &AppConfig) -> Self {
        Self {
            model: config.gemini.model.clone(),
            temperature: config.gemini.temperature,
            max_tokens: config.gemini.max_tokens,
            top_k: config.gemini.top_k,
            top_p: config.gemini.top_p,
            timeout_ms: config.gemini.timeout_ms,
            cache_enabled: config.cache.enabled,
            cache_ttl_ms: config.cache.ttl_ms,
            cache_max_size: config.cache.max_size,
            concurrency: config.rate_limit.concurrency,
            retry: config.retry.clone(),
        }
    }
}
