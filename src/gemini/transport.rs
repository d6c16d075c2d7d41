// Gemini REST transport over reqwest
// Author: kelexine (https://github.com/kelexine)

use super::{ApiKey, ResponseStream, Transport};
use crate::config::GeminiConfig;
use crate::error::{ClientError, Result};
use crate::models::gemini::{GenerateContentRequest, GenerateContentResponse};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, error};

/// HTTP transport for the public Gemini API.
///
/// Handles request signing and error mapping. Deadlines and retries are
/// applied by the client on top of this transport, so the HTTP client itself
/// only bounds connection setup.
pub struct HttpTransport {
    http_client: Client,
    base_url: String,
    api_key: ApiKey,
}

impl HttpTransport {
    /// Create a transport from configuration.
    ///
    /// Fails if no API key is configured.
    pub fn new(config: &GeminiConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(ClientError::Config(
                "gemini.api_key is empty (set GEMINI_API_KEY or GEMGUARD_GEMINI__API_KEY)".into(),
            ));
        }

        // Configure HTTP client for optimal streaming performance
        let http_client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Some(Duration::from_secs(60)))
            .tcp_nodelay(true)
            .use_rustls_tls()
            .build()
            .map_err(|e| ClientError::Config(format!("Failed to create HTTP client: {}", e)))?;

        debug!("Created HTTP client with connection pooling and keep-alive");

        Ok(Self::with_client(
            http_client,
            &config.api_base_url,
            ApiKey::new(config.api_key.clone()),
        ))
    }

    /// Build a transport around an existing reqwest client.
    pub fn with_client(http_client: Client, base_url: &str, api_key: ApiKey) -> Self {
        Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    /// Get the API base_url
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, model: &str, method: &str) -> String {
        let model = model.strip_prefix("models/").unwrap_or(model);
        format!("{}/models/{}:{}", self.base_url, model, method)
    }

    async fn post(&self, url: &str, request: &GenerateContentRequest, sse: bool) -> Result<reqwest::Response> {
        let mut builder = self
            .http_client
            .post(url)
            .header("x-goog-api-key", self.api_key.expose())
            .header("Content-Type", "application/json")
            .json(request);
        if sse {
            builder = builder.header("Accept", "text/event-stream");
        }

        let response = builder.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!(
                "Gemini API error: HTTP {} - Response body: {}",
                status,
                crate::utils::logging::sanitize(&error_text)
            );
            return Err(ClientError::from_status(status.as_u16(), &error_text));
        }

        Ok(response)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    /// Call Gemini `generateContent` API (blocking).
    async fn generate(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse> {
        let url = self.endpoint(model, "generateContent");
        debug!("Calling generateContent API for model: {}", model);

        let response = self.post(&url, request, false).await?;
        let response_text = response.text().await?;

        debug!(
            "Raw Gemini response (first 500 chars): {}",
            response_text.chars().take(500).collect::<String>()
        );

        // Same bytes on every attempt, so a shape mismatch is not retried
        serde_json::from_str(&response_text).map_err(|e| {
            error!("Failed to parse Gemini response: {}", e);
            ClientError::Json(e)
        })
    }

    /// Call Gemini `streamGenerateContent` API for SSE streaming.
    async fn stream(&self, model: &str, request: &GenerateContentRequest) -> Result<ResponseStream> {
        let url = format!("{}?alt=sse", self.endpoint(model, "streamGenerateContent"));
        debug!("Starting Gemini SSE stream for model: {}", model);

        let response = self.post(&url, request, true).await?;
        let event_stream = super::streaming::parse_sse_stream(response.bytes_stream());

        Ok(Box::pin(event_stream))
    }
}
