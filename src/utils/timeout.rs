// Deadline supervision for a single attempt
// Author: kelexine (https://github.com/kelexine)

use crate::error::{ClientError, Result};
use std::future::Future;
use std::time::Duration;

/// Race `operation` against a timer.
///
/// On expiry the operation future is dropped, which cancels it at its next
/// suspension point (an in-flight HTTP request is aborted with it). Nothing it
/// would have produced reaches the cache, since write-back only happens on the
/// winning path.
pub async fn with_timeout<F, T>(duration: Duration, operation: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(duration, operation).await {
        Ok(result) => result,
        Err(_) => Err(ClientError::Timeout { duration }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_timeout_carries_duration() {
        let err = with_timeout(Duration::from_millis(250), async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok::<_, ClientError>(())
        })
        .await
        .unwrap_err();

        match err {
            ClientError::Timeout { duration } => assert_eq!(duration, Duration::from_millis(250)),
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fast_operation_wins() {
        let value = with_timeout(Duration::from_millis(250), async { Ok(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_operation_error_passes_through() {
        let err = with_timeout(Duration::from_secs(1), async {
            Err::<(), _>(ClientError::NoCandidate)
        })
        .await
        .unwrap_err();
        assert!(matches!(err, ClientError::NoCandidate));
    }
}
