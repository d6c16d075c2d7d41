//! Configuration data structures for the gemguard client.
//!
//! This module defines the schema for the client settings: upstream model
//! parameters, response cache, admission control, retry policy and logging.
//!
//! Author: kelexine (<https://github.com/kelexine>)

use serde::{Deserialize, Serialize};

/// The root configuration object for the client.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Upstream Gemini API and default generation settings.
    #[serde(default)]
    pub gemini: GeminiConfig,

    /// In-memory response cache settings.
    #[serde(default)]
    pub cache: CacheSettings,

    /// Admission control (concurrent in-flight calls).
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Retry and backoff policy.
    #[serde(default)]
    pub retry: RetryConfig,

    /// Logging and observability settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Settings for the upstream Gemini API connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// API key sent in the `x-goog-api-key` header.
    /// Default: empty (falls back to `GEMINI_API_KEY`).
    #[serde(default)]
    pub api_key: String,

    /// Base URL for the Gemini REST API.
    /// Default: `https://generativelanguage.googleapis.com/v1beta`
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Model used when a request does not name one.
    /// Default: `gemini-1.5-flash`
    #[serde(default = "default_model")]
    pub model: String,

    /// Default: `0.7`
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum output tokens.
    /// Default: `2048`
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Default: `40`
    #[serde(default = "default_top_k")]
    pub top_k: u32,

    /// Default: `0.95`
    #[serde(default = "default_top_p")]
    pub top_p: f32,

    /// Per-attempt request timeout in milliseconds.
    /// Default: `30000`
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

/// Settings for the response cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Default: `true`
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Entry time-to-live in milliseconds.
    /// Default: `300000` (5 minutes)
    #[serde(default = "default_cache_ttl_ms")]
    pub ttl_ms: u64,

    /// Maximum number of entries before LRU eviction. `0` disables the bound.
    /// Default: `100`
    #[serde(default = "default_cache_max_size")]
    pub max_size: usize,

    /// Interval of the background expiry sweep in milliseconds.
    /// Default: `60000`
    #[serde(default = "default_sweep_interval_ms")]
    pub sweep_interval_ms: u64,
}

/// Settings for the admission gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Maximum number of in-flight transport calls.
    /// Default: `5`
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

/// Settings for retry with exponential backoff.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Default: `3`
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Default: `1000`
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Default: `2.0`
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Default: `10000`
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

/// Settings for application logging and output format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Minimum log level (`trace`, `debug`, `info`, `warn`, `error`).
    /// Default: `info`
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format for logs (`pretty`, `json`, `compact`).
    /// Default: `pretty`
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base_url: default_api_base_url(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            top_k: default_top_k(),
            top_p: default_top_p(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_ms: default_cache_ttl_ms(),
            max_size: default_cache_max_size(),
            sweep_interval_ms: default_sweep_interval_ms(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

// Helper functions for serde defaults
fn default_api_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    2048
}

fn default_top_k() -> u32 {
    40
}

fn default_top_p() -> f32 {
    0.95
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_true() -> bool {
    true
}

fn default_cache_ttl_ms() -> u64 {
    300_000 // 5 minutes
}

fn default_cache_max_size() -> usize {
    100
}

fn default_sweep_interval_ms() -> u64 {
    60_000
}

fn default_concurrency() -> usize {
    5
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_max_delay_ms() -> u64 {
    10_000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}
