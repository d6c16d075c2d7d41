// Shared test transport
// Author: kelexine (https://github.com/kelexine)

#![allow(dead_code)]

use async_trait::async_trait;
use gemguard::config::AppConfig;
use gemguard::error::Result;
use gemguard::gemini::{ResponseStream, Transport};
use gemguard::models::gemini::{
    Candidate, Content, GenerateContentRequest, GenerateContentResponse, Part, UsageMetadata,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::time::Duration;

type GenerateFn = Box<dyn Fn(u32) -> Result<GenerateContentResponse> + Send + Sync>;
type StreamFn = Box<dyn Fn(u32) -> Result<Vec<Result<GenerateContentResponse>>> + Send + Sync>;

/// In-memory transport that counts calls and tracks concurrency.
pub struct MockTransport {
    pub calls: AtomicU32,
    pub stream_calls: AtomicU32,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    pub last_request: Mutex<Option<GenerateContentRequest>>,
    delay: Duration,
    hang_after_stream: bool,
    generate: GenerateFn,
    stream: StreamFn,
}

impl MockTransport {
    pub fn new(generate: impl Fn(u32) -> Result<GenerateContentResponse> + Send + Sync + 'static) -> Self {
        Self {
            calls: AtomicU32::new(0),
            stream_calls: AtomicU32::new(0),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
            last_request: Mutex::new(None),
            delay: Duration::ZERO,
            hang_after_stream: false,
            generate: Box::new(generate),
            stream: Box::new(|_| Ok(Vec::new())),
        }
    }

    pub fn text(reply: &'static str) -> Self {
        Self::new(move |_| Ok(text_response(reply)))
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_stream(
        mut self,
        stream: impl Fn(u32) -> Result<Vec<Result<GenerateContentResponse>>> + Send + Sync + 'static,
    ) -> Self {
        self.stream = Box::new(stream);
        self
    }

    /// Keep the upstream stream open forever after the scripted items.
    pub fn hanging(mut self) -> Self {
        self.hang_after_stream = true;
        self
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn generate(
        &self,
        _model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        *self.last_request.lock() = Some(request.clone());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        (self.generate)(call)
    }

    async fn stream(&self, _model: &str, request: &GenerateContentRequest) -> Result<ResponseStream> {
        use futures::StreamExt;

        let call = self.stream_calls.fetch_add(1, Ordering::SeqCst) + 1;
        *self.last_request.lock() = Some(request.clone());
        let items = futures::stream::iter((self.stream)(call)?);
        if self.hang_after_stream {
            Ok(Box::pin(items.chain(futures::stream::pending())))
        } else {
            Ok(Box::pin(items))
        }
    }
}

pub fn text_response(text: &str) -> GenerateContentResponse {
    response(vec![Part::text(text)], None)
}

pub fn response(parts: Vec<Part>, finish_reason: Option<&str>) -> GenerateContentResponse {
    GenerateContentResponse {
        candidates: vec![Candidate {
            content: Content::model(parts),
            finish_reason: finish_reason.map(str::to_string),
            ..Default::default()
        }],
        ..Default::default()
    }
}

pub fn with_usage(mut response: GenerateContentResponse, total: u32) -> GenerateContentResponse {
    response.usage_metadata = Some(UsageMetadata {
        total_token_count: Some(total),
        ..Default::default()
    });
    response
}

/// Defaults with short backoff so retry paths stay quick under paused time.
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.retry.base_delay_ms = 10;
    config.retry.max_delay_ms = 100;
    config
}
