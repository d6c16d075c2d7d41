// Error classification tests
// Author: kelexine (https://github.com/kelexine)

use gemguard::error::ClientError;
use std::time::Duration;

#[test]
fn test_error_display_messages() {
    let errors = vec![
        ClientError::Auth("bad key".to_string()),
        ClientError::QuotaExceeded("daily limit".to_string()),
        ClientError::Timeout {
            duration: Duration::from_millis(1500),
        },
        ClientError::Upstream {
            status: 503,
            message: "overloaded".to_string(),
        },
        ClientError::NoCandidate,
        ClientError::NoFunctionCall,
        ClientError::ClientDestroyed,
    ];

    for error in errors {
        let display = format!("{}", error);
        assert!(!display.is_empty(), "Error should have display message");
    }

    let timeout = ClientError::Timeout {
        duration: Duration::from_millis(1500),
    };
    assert!(timeout.to_string().contains("1500ms"));
}

#[test]
fn test_legacy_messages_classified() {
    let cases = [
        ("API key not valid. Please pass a valid API key.", "auth"),
        ("Request had invalid authentication credentials", "auth"),
        ("PERMISSION_DENIED: caller lacks access", "permission_denied"),
        ("429 Quota exceeded for quota metric", "quota_exceeded"),
        ("RESOURCE_EXHAUSTED", "quota_exceeded"),
        ("Rate limit exceeded, slow down", "rate_limited"),
        ("fetch failed: ECONNREFUSED", "transport"),
        ("socket hang up", "transport"),
    ];

    for (message, kind) in cases {
        assert_eq!(ClientError::from_message(message).kind(), kind, "{message}");
    }
}

#[test]
fn test_retryability() {
    assert!(ClientError::from_message("network unreachable").is_retryable());
    assert!(ClientError::Timeout {
        duration: Duration::from_secs(1)
    }
    .is_retryable());
    assert!(ClientError::from_status(500, "internal").is_retryable());
    assert!(ClientError::from_status(503, "unavailable").is_retryable());
    assert!(ClientError::from_status(408, "request timeout").is_retryable());

    assert!(!ClientError::from_status(400, "bad request").is_retryable());
    assert!(!ClientError::from_status(401, "unauthorized").is_retryable());
    assert!(!ClientError::from_status(429, "quota exhausted").is_retryable());
    assert!(!ClientError::from_message("quota exceeded").is_retryable());
    assert!(!ClientError::NoCandidate.is_retryable());
    assert!(!ClientError::NoFunctionCall.is_retryable());
    assert!(!ClientError::ClientDestroyed.is_retryable());
}

#[test]
fn test_status_mapping_reads_google_error_body() {
    let body = r#"{"error":{"code":400,"message":"API key not valid. Please pass a valid API key.","status":"INVALID_ARGUMENT"}}"#;
    match ClientError::from_status(400, body) {
        ClientError::Auth(message) => assert!(message.starts_with("API key not valid")),
        other => panic!("expected auth error, got {other:?}"),
    }

    assert!(matches!(
        ClientError::from_status(403, "{}"),
        ClientError::PermissionDenied(_)
    ));
    assert!(matches!(
        ClientError::from_status(404, "not found"),
        ClientError::Upstream { status: 404, .. }
    ));
}
