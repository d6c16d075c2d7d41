// Error types for the gemguard client
// Author: kelexine (https://github.com/kelexine)

use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("Operation timed out after {}ms", .duration.as_millis())]
    Timeout { duration: Duration },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Upstream error (HTTP {status}): {message}")]
    Upstream { status: u16, message: String },

    #[error("No candidates returned by the model")]
    NoCandidate,

    #[error("Model response contained no function call")]
    NoFunctionCall,

    #[error("Client has been destroyed")]
    ClientDestroyed,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Config parsing error: {0}")]
    ConfigParsing(#[from] config::ConfigError),
}

/// Message fragments that mark an untyped error as non-retryable, paired with
/// the typed variant they map to.
static NON_RETRYABLE_PATTERNS: Lazy<Vec<(Regex, NonRetryableKind)>> = Lazy::new(|| {
    vec![
        (
            Regex::new(r"(?i)invalid api key|api key not valid|unauthenticated|authentication|invalid credentials")
                .expect("static regex"),
            NonRetryableKind::Auth,
        ),
        (
            Regex::new(r"(?i)permission denied|permission_denied").expect("static regex"),
            NonRetryableKind::PermissionDenied,
        ),
        (
            Regex::new(r"(?i)quota exceeded|resource exhausted|resource_exhausted")
                .expect("static regex"),
            NonRetryableKind::Quota,
        ),
        (
            Regex::new(r"(?i)rate[ -]limit exceeded|rate-limit").expect("static regex"),
            NonRetryableKind::RateLimit,
        ),
    ]
});

#[derive(Debug, Clone, Copy)]
enum NonRetryableKind {
    Auth,
    PermissionDenied,
    Quota,
    RateLimit,
}

impl ClientError {
    /// Whether the retry executor may re-invoke the failed operation.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Timeout { .. } | ClientError::Transport(_) => true,
            // Builder and decode failures repeat identically on every attempt
            ClientError::Http(e) => !(e.is_builder() || e.is_decode()),
            ClientError::Upstream { status, .. } => *status >= 500 || *status == 408,
            _ => false,
        }
    }

    /// Classify an untyped error message (legacy adapter for third-party errors).
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        for (pattern, kind) in NON_RETRYABLE_PATTERNS.iter() {
            if pattern.is_match(&message) {
                return match kind {
                    NonRetryableKind::Auth => ClientError::Auth(message),
                    NonRetryableKind::PermissionDenied => ClientError::PermissionDenied(message),
                    NonRetryableKind::Quota => ClientError::QuotaExceeded(message),
                    NonRetryableKind::RateLimit => ClientError::RateLimited(message),
                };
            }
        }
        ClientError::Transport(message)
    }

    /// Map a non-2xx HTTP response to a typed error.
    pub fn from_status(status: u16, body: &str) -> Self {
        let message = extract_error_message(body).unwrap_or_else(|| body.to_string());
        match status {
            401 => ClientError::Auth(message),
            403 => ClientError::PermissionDenied(message),
            429 => {
                let lower = message.to_lowercase();
                if lower.contains("quota") || lower.contains("exhausted") {
                    ClientError::QuotaExceeded(message)
                } else {
                    ClientError::RateLimited(message)
                }
            }
            400 if message.to_lowercase().contains("api key") => ClientError::Auth(message),
            _ => ClientError::Upstream { status, message },
        }
    }

    /// Short machine-readable label used for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ClientError::Auth(_) => "auth",
            ClientError::PermissionDenied(_) => "permission_denied",
            ClientError::QuotaExceeded(_) => "quota_exceeded",
            ClientError::RateLimited(_) => "rate_limited",
            ClientError::Timeout { .. } => "timeout",
            ClientError::Transport(_) | ClientError::Http(_) => "transport",
            ClientError::Upstream { .. } => "upstream",
            ClientError::NoCandidate => "no_candidate",
            ClientError::NoFunctionCall => "no_function_call",
            ClientError::ClientDestroyed => "client_destroyed",
            ClientError::InvalidRequest(_) => "invalid_request",
            ClientError::Config(_) | ClientError::ConfigParsing(_) => "config",
            ClientError::Io(_) => "io",
            ClientError::Json(_) => "json",
        }
    }
}

/// Extract `error.message` (or `error.status`) from a Google API error body
fn extract_error_message(body: &str) -> Option<String> {
    #[derive(serde::Deserialize)]
    struct ErrorResponse {
        error: Option<ErrorDetail>,
    }

    #[derive(serde::Deserialize)]
    struct ErrorDetail {
        message: Option<String>,
        status: Option<String>,
    }

    let parsed: ErrorResponse = serde_json::from_str(body).ok()?;
    let detail = parsed.error?;
    detail.message.or(detail.status)
}

pub type Result<T> = std::result::Result<T, ClientError>;
