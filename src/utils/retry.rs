//! Retry utilities: backoff builders and bounded attempts for content
//! operations.
//!
//! Uses `backon` for exponential backoff with jitter. Every attempt is bounded
//! by a timeout; only transient [`ContentError`]s are retried.

use std::future::Future;
use std::time::Duration;

use backon::{BackoffBuilder, ExponentialBuilder};
use tracing::warn;

use crate::config::PublishConfig;
use crate::interfaces::ContentError;

/// Retry budget for one manifest operation.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: usize,
    pub min_delay: Duration,
    pub max_delay: Duration,
    /// Bound on each attempt.
    pub timeout: Duration,
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&PublishConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &PublishConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            min_delay: config.min_delay(),
            max_delay: config.max_delay(),
            timeout: config.operation_timeout(),
            jitter: config.jitter,
        }
    }

    /// Single attempt, no waiting.
    pub fn no_retry(timeout: Duration) -> Self {
        Self {
            max_retries: 0,
            min_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            timeout,
            jitter: false,
        }
    }

    pub fn backoff(&self) -> ExponentialBuilder {
        let builder = ExponentialBuilder::default()
            .with_min_delay(self.min_delay)
            .with_max_delay(self.max_delay.max(self.min_delay))
            .with_max_times(self.max_retries);
        if self.jitter {
            builder.with_jitter()
        } else {
            builder
        }
    }
}

/// Run `op` until it succeeds, fails permanently, or the budget runs out.
///
/// The first attempt runs immediately. An attempt exceeding
/// `policy.timeout` counts as a transient `ContentError::Timeout`.
pub async fn run_with_retry<T, F, Fut>(
    label: &str,
    policy: &RetryPolicy,
    mut op: F,
) -> Result<T, ContentError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ContentError>>,
{
    let backoff = policy.backoff().build();
    let mut last_error = None;

    for (attempt, delay) in std::iter::once(Duration::ZERO).chain(backoff).enumerate() {
        if attempt > 0 {
            tokio::time::sleep(delay).await;
        }

        let result = match tokio::time::timeout(policy.timeout, op()).await {
            Ok(result) => result,
            Err(_) => Err(ContentError::Timeout(policy.timeout)),
        };

        match result {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() => {
                warn!(
                    operation = label,
                    attempt = attempt + 1,
                    max_retries = policy.max_retries,
                    error = %e,
                    "Transient content error, retrying..."
                );
                last_error = Some(e);
            }
            Err(e) => return Err(e),
        }
    }

    Err(last_error.unwrap_or(ContentError::Timeout(policy.timeout)))
}
