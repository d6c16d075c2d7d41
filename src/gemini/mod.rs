// Gemini transport module
// Author: kelexine (https://github.com/kelexine)

pub mod streaming;
mod transport;

pub use transport::HttpTransport;

use crate::error::Result;
use crate::models::gemini::{GenerateContentRequest, GenerateContentResponse};
use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;
use zeroize::Zeroize;

/// Chunked upstream response, one item per streamed event.
pub type ResponseStream = Pin<Box<dyn Stream<Item = Result<GenerateContentResponse>> + Send>>;

/// The remote model call the client guards.
///
/// Implementations either return a response, a stream of response deltas, or
/// a typed [`crate::error::ClientError`] whose variant decides whether the
/// call is retried.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Single-shot generation.
    async fn generate(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse>;

    /// Open a streamed generation. Errors returned here happen while
    /// establishing the stream; mid-stream failures arrive as stream items.
    async fn stream(&self, model: &str, request: &GenerateContentRequest) -> Result<ResponseStream>;
}

/// Gemini API key, wiped from memory on drop
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// Custom Debug impl that never logs the key
impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiKey([REDACTED])")
    }
}
