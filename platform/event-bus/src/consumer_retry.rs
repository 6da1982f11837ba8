//! Consumer retry logic with exponential backoff
//!
//! Bounded redelivery for event consumers. Once the attempts are spent the
//! caller turns the collected failures into a fault envelope.

use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the first)
    pub max_attempts: u32,
    /// Initial backoff duration (doubles on each retry)
    pub initial_backoff: Duration,
    /// Maximum backoff duration to cap exponential growth
    pub max_backoff: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(30),
        }
    }
}

/// Every error observed by a retry loop that gave up
#[derive(Debug, Clone, PartialEq)]
pub struct RetryExhausted<E> {
    /// Attempts actually made
    pub attempts: u32,
    /// One error per attempt, oldest first; never empty
    pub errors: Vec<E>,
}

impl<E> RetryExhausted<E> {
    /// The error from the final attempt
    pub fn into_last(mut self) -> E {
        // errors has exactly `attempts` entries and attempts >= 1
        self.errors
            .pop()
            .unwrap_or_else(|| unreachable!("retry loop records one error per attempt"))
    }
}

/// Retry a fallible async operation with exponential backoff
///
/// # Example
/// ```rust
/// use event_bus::consumer_retry::{retry_with_backoff, RetryConfig};
///
/// # async fn example() -> Result<(), String> {
/// let config = RetryConfig::default();
/// let result = retry_with_backoff(
///     || async { Ok::<_, String>(42) },
///     &config,
///     "example_operation"
/// ).await?;
/// # Ok(())
/// # }
/// ```
pub async fn retry_with_backoff<F, Fut, T, E>(
    operation: F,
    config: &RetryConfig,
    context: &str,
) -> Result<T, E>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display + Send,
{
    retry_with_backoff_if(operation, config, context, |_| true)
        .await
        .map_err(RetryExhausted::into_last)
}

/// Retry while `should_retry` accepts the error, collecting every failure
///
/// Stops early on the first error `should_retry` rejects; stops after
/// `config.max_attempts` attempts otherwise.
pub async fn retry_with_backoff_if<F, Fut, T, E, P>(
    operation: F,
    config: &RetryConfig,
    context: &str,
    should_retry: P,
) -> Result<T, RetryExhausted<E>>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display + Send,
    P: Fn(&E) -> bool,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0;
    let mut backoff = config.initial_backoff;
    let mut errors = Vec::new();

    loop {
        attempt += 1;

        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    debug!(
                        context = %context,
                        attempt = attempt,
                        "Operation succeeded after retry"
                    );
                }
                return Ok(result);
            }
            Err(e) => {
                let retryable = should_retry(&e);

                if !retryable || attempt >= max_attempts {
                    warn!(
                        context = %context,
                        attempts = attempt,
                        retryable = retryable,
                        error = %e,
                        "Operation failed, giving up"
                    );
                    errors.push(e);
                    return Err(RetryExhausted {
                        attempts: attempt,
                        errors,
                    });
                }

                warn!(
                    context = %context,
                    attempt = attempt,
                    max_attempts = max_attempts,
                    backoff_ms = backoff.as_millis(),
                    error = %e,
                    "Operation failed, retrying with backoff"
                );
                errors.push(e);

                sleep(backoff).await;

                // Exponential backoff with cap
                backoff = std::cmp::min(backoff * 2, config.max_backoff);
            }
        }
    }
}
