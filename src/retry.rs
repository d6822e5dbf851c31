use crate::{GistError, Result};
use std::future::Future;

/// Configuration for retry behavior
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Maximum number of retry attempts after the first try
    pub max_retries: u32,
    /// Base delay for exponential backoff (in seconds)
    pub base_delay: u64,
    /// Maximum delay cap (in seconds)
    pub max_delay: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 1,
            base_delay: 1,
            max_delay: 10,
        }
    }
}

impl RetryConfig {
    /// Create a config that tries exactly once
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// Delay before retry number `retry` (0-based).
    pub fn delay_for(&self, retry: u32) -> u64 {
        let factor = 2_u64.saturating_pow(retry);
        std::cmp::min(self.base_delay.saturating_mul(factor), self.max_delay)
    }
}

/// Result of a retry operation with context
#[derive(Debug)]
pub struct RetryResult<T> {
    /// The successful result
    pub result: T,
    /// Number of retry attempts made
    pub attempts_made: u32,
    /// Total time spent waiting between attempts (in seconds)
    pub total_retry_time: u64,
}

/// Execute an async operation, retrying transient failures with exponential backoff.
///
/// Only errors for which [`GistError::is_transient`] holds are retried;
/// everything else is returned immediately.
///
/// # Arguments
/// * `config` - Retry configuration
/// * `operation_name` - Name of the operation for logging
/// * `operation` - Async function that returns a Result
/// * `on_retry` - Callback invoked before each wait (delay in seconds, error)
pub async fn retry_with_backoff<T, F, Fut, OnRetry>(
    config: &RetryConfig,
    operation_name: &str,
    mut operation: F,
    mut on_retry: OnRetry,
) -> Result<RetryResult<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
    OnRetry: FnMut(u64, &GistError),
{
    let mut retries = 0;
    let mut total_retry_time = 0;

    loop {
        match operation().await {
            Ok(result) => {
                return Ok(RetryResult {
                    result,
                    attempts_made: retries,
                    total_retry_time,
                });
            }
            Err(err) if err.is_transient() => {
                if retries >= config.max_retries {
                    if config.max_retries > 0 {
                        log::warn!(
                            "Max retries ({}) exceeded for {} operation",
                            config.max_retries,
                            operation_name
                        );
                    }
                    return Err(err);
                }

                let delay = config.delay_for(retries);

                log::info!(
                    "{} failed ({}). Waiting {} seconds before retry {} of {}",
                    operation_name,
                    err,
                    delay,
                    retries + 1,
                    config.max_retries
                );

                on_retry(delay, &err);

                tokio::time::sleep(std::time::Duration::from_secs(delay)).await;
                retries += 1;
                total_retry_time += delay;
            }
            Err(other_error) => {
                return Err(other_error);
            }
        }
    }
}

/// Simplified retry function for operations that don't need a retry callback
///
/// ```rust
/// use lastfm_gist::retry::{retry_operation, RetryConfig};
/// use lastfm_gist::GistError;
///
/// # tokio_test::block_on(async {
/// let config = RetryConfig { max_retries: 1, base_delay: 0, max_delay: 0 };
/// let mut calls = 0;
/// let outcome = retry_operation(&config, "recent tracks", || {
///     calls += 1;
///     let attempt = calls;
///     async move {
///         if attempt == 1 {
///             Err(GistError::Fetch("connection reset".to_string()))
///         } else {
///             Ok(attempt)
///         }
///     }
/// })
/// .await?;
/// assert_eq!(outcome.result, 2);
/// assert_eq!(outcome.attempts_made, 1);
/// # Ok::<(), GistError>(())
/// # });
/// ```
pub async fn retry_operation<T, F, Fut>(
    config: &RetryConfig,
    operation_name: &str,
    operation: F,
) -> Result<RetryResult<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    retry_with_backoff(config, operation_name, operation, |delay, err| {
        log::debug!("Retrying {operation_name} in {delay} seconds after: {err}");
    })
    .await
}
