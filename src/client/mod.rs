//! Resilient client façade.
//!
//! [`GenerativeClient`] composes the response cache, the admission gate and
//! the retry/timeout executors around a [`Transport`]. Every call follows the
//! same path:
//!
//! 1. Consult the cache (read-through) when caching applies
//! 2. Acquire an admission permit, held until the call finishes
//! 3. Run the transport call under retry, each attempt under a deadline
//! 4. Write a successful response back to the cache
//!
//! Author: kelexine (<https://github.com/kelexine>)

mod context;
mod functions;
mod stats;
mod stream;

pub use context::{ErrorObserver, RequestContext};
pub use stats::{ClientStats, ConfigSnapshot};
pub use stream::ChunkStream;

use crate::cache::{CacheConfig, CacheManager};
use crate::config::AppConfig;
use crate::error::{ClientError, Result};
use crate::gemini::{HttpTransport, Transport};
use crate::limiter::AdmissionGate;
use crate::metrics;
use crate::models::gemini::{
    Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig, Part,
};
use crate::models::options::RequestOptions;
use crate::utils::retry::{with_retry, RetryPolicy};
use crate::utils::timeout::with_timeout;
use serde::Serialize;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

struct ClientInner {
    config: AppConfig,
    transport: Arc<dyn Transport>,
    cache: CacheManager<GenerateContentResponse>,
    gate: AdmissionGate,
    retry_policy: RetryPolicy,
    request_timeout: Duration,
    observer: Option<Arc<dyn ErrorObserver>>,
    destroyed: AtomicBool,
}

/// Everything that makes two generate calls interchangeable.
#[derive(Serialize)]
struct CacheKeyPayload<'a> {
    model: &'a str,
    request: &'a GenerateContentRequest,
}

/// Builder for [`GenerativeClient`].
pub struct ClientBuilder {
    config: AppConfig,
    transport: Option<Arc<dyn Transport>>,
    observer: Option<Arc<dyn ErrorObserver>>,
}

impl ClientBuilder {
    /// Use a specific transport instead of the HTTP one.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Register an observer notified of failures.
    pub fn observer(mut self, observer: Arc<dyn ErrorObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Validate configuration and assemble the client.
    ///
    /// The cache sweeper is only started when building inside a Tokio runtime;
    /// expired entries are otherwise dropped on access.
    pub fn build(self) -> Result<GenerativeClient> {
        self.config.validate()?;

        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::new(&self.config.gemini)?),
        };

        let inner = ClientInner {
            cache: CacheManager::new(CacheConfig::from(&self.config.cache)),
            gate: AdmissionGate::new(self.config.rate_limit.concurrency),
            retry_policy: RetryPolicy::from(&self.config.retry),
            request_timeout: Duration::from_millis(self.config.gemini.timeout_ms),
            transport,
            observer: self.observer,
            destroyed: AtomicBool::new(false),
            config: self.config,
        };

        info!(
            "Client ready: model={}, concurrency={}, max_attempts={}",
            inner.config.gemini.model,
            inner.config.rate_limit.concurrency,
            inner.retry_policy.max_attempts
        );

        Ok(GenerativeClient {
            inner: Arc::new(inner),
        })
    }
}

/// Client for text generation, streaming and function calling.
///
/// Cheap to clone; clones share cache, admission gate and lifecycle.
#[derive(Clone)]
pub struct GenerativeClient {
    inner: Arc<ClientInner>,
}

impl GenerativeClient {
    pub fn builder(config: AppConfig) -> ClientBuilder {
        ClientBuilder {
            config,
            transport: None,
            observer: None,
        }
    }

    /// Create a client over the given transport.
    pub fn new(config: AppConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        Self::builder(config).transport(transport).build()
    }

    /// Create a client talking to the Gemini REST API.
    pub fn from_config(config: AppConfig) -> Result<Self> {
        Self::builder(config).build()
    }

    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    /// Generate text for `prompt`, served from the cache when possible.
    pub async fn generate_text(&self, prompt: &str, options: &RequestOptions) -> Result<String> {
        let ctx = RequestContext::new("generateText", prompt, options);
        let response = self.generate_cached(&ctx, prompt, options).await?;
        match response.text() {
            Some(text) => Ok(text),
            None => {
                let err = ClientError::NoCandidate;
                self.report(&err, &ctx);
                Err(err)
            }
        }
    }

    /// Generate and return the full upstream response.
    pub async fn generate_raw_content(
        &self,
        prompt: &str,
        options: &RequestOptions,
    ) -> Result<GenerateContentResponse> {
        let ctx = RequestContext::new("generateRawContent", prompt, options);
        self.generate_cached(&ctx, prompt, options).await
    }

    /// Statistics for the cache, the admission gate and the active configuration.
    pub fn stats(&self) -> ClientStats {
        ClientStats {
            cache: self.inner.cache.stats(),
            rate_limiter: self.inner.gate.status(),
            config: ConfigSnapshot::from(&self.inner.config),
        }
    }

    /// Drop every cached response.
    pub fn clear_cache(&self) {
        self.inner.cache.clear();
    }

    /// Stop the cache sweeper and reject queued callers. Idempotent.
    ///
    /// Calls already holding a permit run to completion; new calls fail with
    /// [`ClientError::ClientDestroyed`].
    pub fn destroy(&self) {
        if self.inner.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.inner.cache.destroy();
        self.inner.cache.clear();
        self.inner.gate.close();
        info!("Client destroyed");
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.destroyed.load(Ordering::SeqCst)
    }

    async fn generate_cached(
        &self,
        ctx: &RequestContext,
        prompt: &str,
        options: &RequestOptions,
    ) -> Result<GenerateContentResponse> {
        if let Err(e) = self.ensure_alive() {
            self.report(&e, ctx);
            return Err(e);
        }

        let model = self.resolve_model(options);
        let request = self.build_request(prompt, options);

        let cache_key = if self.cache_enabled_for(options) {
            let payload = CacheKeyPayload {
                model: &model,
                request: &request,
            };
            match CacheManager::<GenerateContentResponse>::create_hash_key("generate", &payload) {
                Ok(key) => Some(key),
                Err(e) => {
                    // Cache failures degrade to a miss
                    metrics::record_cache_op("error");
                    self.report(&e, ctx);
                    None
                }
            }
        } else {
            None
        };

        if let Some(key) = &cache_key {
            if let Some(hit) = self.inner.cache.get(key) {
                debug!("Cache hit for {} [{}]", ctx.operation, ctx.request_id);
                return Ok(hit);
            }
        }

        let transport = &self.inner.transport;
        let result = self
            .call_guarded("generate", || transport.generate(&model, &request))
            .await;

        match result {
            Ok(response) => {
                if let Some(key) = cache_key {
                    // A destroyed client keeps its cache empty
                    if !response.candidates.is_empty() && !self.is_destroyed() {
                        self.inner.cache.set(key, response.clone(), options.cache_ttl);
                    }
                }
                Ok(response)
            }
            Err(e) => {
                self.report(&e, ctx);
                Err(e)
            }
        }
    }

    /// Hold one admission permit across every retry attempt of `call`.
    async fn call_guarded<T, F, Fut>(&self, operation: &'static str, mut call: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let _permit = self.inner.gate.acquire().await?;
        let timeout = self.inner.request_timeout;

        with_retry(operation, &self.inner.retry_policy, None, || {
            instrumented(operation, with_timeout(timeout, call()))
        })
        .await
    }

    fn ensure_alive(&self) -> Result<()> {
        if self.is_destroyed() {
            Err(ClientError::ClientDestroyed)
        } else {
            Ok(())
        }
    }

    fn cache_enabled_for(&self, options: &RequestOptions) -> bool {
        self.inner.cache.config().enabled && options.cache.unwrap_or(true)
    }

    fn resolve_model(&self, options: &RequestOptions) -> String {
        options
            .generation
            .model
            .clone()
            .unwrap_or_else(|| self.inner.config.gemini.model.clone())
    }

    /// Build the upstream request: history, then the prompt turn with attachments.
    fn build_request(&self, prompt: &str, options: &RequestOptions) -> GenerateContentRequest {
        let defaults = &self.inner.config.gemini;
        let generation = &options.generation;

        let mut contents = options.history.clone();
        if !prompt.is_empty() || !options.attachments.is_empty() {
            let mut parts = Vec::with_capacity(1 + options.attachments.len());
            if !prompt.is_empty() {
                parts.push(Part::text(prompt));
            }
            parts.extend(options.attachments.iter().cloned().map(|inline_data| Part::InlineData { inline_data }));
            contents.push(Content {
                role: "user".to_string(),
                parts,
            });
        }

        GenerateContentRequest {
            contents,
            system_instruction: generation
                .system_instruction
                .as_ref()
                .map(|text| Content::user(text.clone())),
            generation_config: Some(GenerationConfig {
                max_output_tokens: Some(generation.max_tokens.unwrap_or(defaults.max_tokens)),
                temperature: Some(generation.temperature.unwrap_or(defaults.temperature)),
                top_p: Some(generation.top_p.unwrap_or(defaults.top_p)),
                top_k: Some(generation.top_k.unwrap_or(defaults.top_k)),
                stop_sequences: generation.stop_sequences.clone(),
                candidate_count: None,
            }),
            tools: None,
            tool_config: None,
        }
    }

    fn report(&self, err: &ClientError, ctx: &RequestContext) {
        context::report(self.inner.observer.as_ref(), err, ctx);
    }
}

/// Record duration and outcome of a single transport attempt.
async fn instrumented<T, Fut>(operation: &str, attempt: Fut) -> Result<T>
where
    Fut: Future<Output = Result<T>>,
{
    let start = Instant::now();
    let result = attempt.await;
    let outcome = match &result {
        Ok(_) => "success",
        Err(e) => e.kind(),
    };
    metrics::record_transport_call(operation, outcome, start.elapsed().as_secs_f64());
    result
}
