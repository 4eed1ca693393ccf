use std::{future::Future, time::Duration};

use tracing::{debug, error, warn};

use crate::server::error::retry::{ErrorRetryStrategy, Retryable};

/// Retry loop with exponential backoff for service calls.
#[derive(Debug, Clone)]
pub struct RetryContext {
    /// Max attempts before failure
    max_attempts: u32,
    /// Backoff after the first failed attempt, doubled after every further failure
    initial_backoff: Duration,
}

impl Default for RetryContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RetryContext {
    const DEFAULT_MAX_ATTEMPTS: u32 = 3;
    const DEFAULT_INITIAL_BACKOFF_SECS: u64 = 1;

    pub fn new() -> Self {
        Self {
            max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
            initial_backoff: Duration::from_secs(Self::DEFAULT_INITIAL_BACKOFF_SECS),
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_initial_backoff(mut self, initial_backoff: Duration) -> Self {
        self.initial_backoff = initial_backoff;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Execute an operation, retrying errors whose own strategy says so.
    ///
    /// # Arguments
    /// - `description`: Description of the operation for logging (e.g., "token info lookup")
    /// - `operation`: Async function performing one attempt
    pub async fn execute_with_retry<R, E, F, Fut>(
        &self,
        description: &str,
        operation: F,
    ) -> Result<R, E>
    where
        E: Retryable + std::fmt::Debug,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<R, E>>,
    {
        self.execute_with_strategy(description, |e: &E| e.to_retry_strategy(), operation)
            .await
    }

    /// Execute an operation with a caller supplied retry classification.
    pub async fn execute_with_strategy<R, E, S, F, Fut>(
        &self,
        description: &str,
        strategy: S,
        mut operation: F,
    ) -> Result<R, E>
    where
        E: std::fmt::Debug,
        S: Fn(&E) -> ErrorRetryStrategy,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<R, E>>,
    {
        let mut attempt_count = 0;

        loop {
            debug!(
                "Processing {} (attempt {}/{})",
                description,
                attempt_count + 1,
                self.max_attempts
            );

            match operation().await {
                Ok(result) => {
                    debug!("Successfully processed {}", description);
                    return Ok(result);
                }
                Err(e) => match strategy(&e) {
                    ErrorRetryStrategy::Fail => {
                        debug!("Permanent error for {}: {:?}", description, e);
                        return Err(e);
                    }
                    ErrorRetryStrategy::Retry => {
                        attempt_count += 1;
                        if attempt_count >= self.max_attempts {
                            error!(
                                "Max attempts ({}) exceeded for {}: {:?}",
                                self.max_attempts, description, e
                            );
                            return Err(e);
                        }

                        let backoff = self.initial_backoff * 2_u32.pow(attempt_count - 1);

                        warn!(
                            "Retrying {} (attempt {}/{}) after {:?}: {:?}",
                            description, attempt_count, self.max_attempts, backoff, e
                        );

                        tokio::time::sleep(backoff).await;
                    }
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::server::error::account::AccountError;

    fn server_error() -> AccountError {
        AccountError::Server {
            endpoint: "/account".to_string(),
            status: 502,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn retries_transient_errors_until_success() {
        let attempts = AtomicU32::new(0);

        let result = RetryContext::new()
            .execute_with_retry("account fetch", || async {
                if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(server_error())
                } else {
                    Ok(7)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_attempts() {
        let attempts = AtomicU32::new(0);

        let result: Result<(), AccountError> = RetryContext::new()
            .execute_with_retry("account fetch", || async {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err(server_error())
            })
            .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn does_not_retry_credential_errors() {
        let attempts = AtomicU32::new(0);

        let result: Result<(), AccountError> = RetryContext::new()
            .execute_with_retry("account fetch", || async {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err(AccountError::InvalidKey {
                    endpoint: "/account".to_string(),
                })
            })
            .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn custom_strategy_overrides_error_strategy() {
        let attempts = AtomicU32::new(0);

        let result: Result<(), AccountError> = RetryContext::new()
            .with_max_attempts(2)
            .execute_with_strategy(
                "key confirmation",
                |_| ErrorRetryStrategy::Retry,
                || async {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Err(AccountError::InvalidKey {
                        endpoint: "/account".to_string(),
                    })
                },
            )
            .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }
}
