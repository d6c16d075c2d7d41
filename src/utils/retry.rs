// Retry logic with bounded exponential backoff
// Author: kelexine (https://github.com/kelexine)

use crate::config::RetryConfig;
use crate::error::Result;
use crate::metrics;
use crate::utils::timeout::with_timeout;
use backoff::{backoff::Backoff, ExponentialBackoff};
use serde::Serialize;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Immutable retry configuration shared by every call of a client.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetryPolicy {
    /// Upper bound on how many times the operation is invoked (>= 1).
    pub max_attempts: u32,
    pub base_delay: Duration,
    /// Growth factor between attempts (> 1).
    pub backoff_multiplier: f64,
    /// Cap on any single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
            backoff_multiplier: config.backoff_multiplier,
            max_delay: Duration::from_millis(config.max_delay_ms),
        }
    }
}

impl RetryPolicy {
    /// Exponential backoff without jitter or an elapsed-time limit; attempts
    /// are bounded by `max_attempts` instead.
    pub fn backoff(&self) -> ExponentialBackoff {
        let initial = self.base_delay.min(self.max_delay);
        ExponentialBackoff {
            current_interval: initial,
            initial_interval: initial,
            randomization_factor: 0.0,
            multiplier: self.backoff_multiplier,
            max_interval: self.max_delay,
            max_elapsed_time: None,
            ..Default::default()
        }
    }

    /// Delay slept after failed attempt number `attempt` (1-based):
    /// `min(base_delay * multiplier^(attempt-1), max_delay)`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let mut backoff = self.backoff();
        let mut delay = backoff.initial_interval;
        for _ in 0..attempt.max(1) {
            delay = backoff.next_backoff().unwrap_or(self.max_delay);
            if delay >= self.max_delay {
                break;
            }
        }
        delay
    }

    /// Every delay the policy can produce, in order (`max_attempts - 1` values).
    pub fn delays(&self) -> impl Iterator<Item = Duration> {
        let mut backoff = self.backoff();
        let max_delay = self.max_delay;
        (1..self.max_attempts).map(move |_| backoff.next_backoff().unwrap_or(max_delay))
    }
}

/// Execute `operation` under `policy`.
///
/// - Each attempt is raced against `attempt_timeout` when one is given
/// - Non-retryable errors are returned from the attempt that produced them
/// - The operation runs at most `policy.max_attempts` times; the last error is returned
pub async fn with_retry<F, Fut, T>(
    operation_name: &str,
    policy: &RetryPolicy,
    attempt_timeout: Option<Duration>,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut backoff = policy.backoff();
    let mut attempt = 0;

    loop {
        attempt += 1;

        let outcome = match attempt_timeout {
            Some(limit) => with_timeout(limit, operation()).await,
            None => operation().await,
        };

        match outcome {
            Ok(result) => {
                if attempt > 1 {
                    debug!("{} succeeded on attempt {}", operation_name, attempt);
                }
                return Ok(result);
            }
            Err(e) => {
                if !e.is_retryable() {
                    debug!(
                        "{} failed with non-retryable {} error on attempt {}",
                        operation_name,
                        e.kind(),
                        attempt
                    );
                    return Err(e);
                }
                if attempt >= max_attempts {
                    warn!(
                        "{} giving up after {} attempts: {}",
                        operation_name, attempt, e
                    );
                    return Err(e);
                }

                let delay = backoff.next_backoff().unwrap_or(policy.max_delay);
                debug!(
                    "{} failed with {} (attempt {}/{}), retrying after {}ms",
                    operation_name,
                    e.kind(),
                    attempt,
                    max_attempts,
                    delay.as_millis()
                );
                metrics::record_retry(operation_name);

                // Wait before retry
                tokio::time::sleep(delay).await;
            }
        }
    }
}
