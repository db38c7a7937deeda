//! Timeout and retry for store calls
//!
//! Every store call made by the service layer runs through [`RetryPolicy::run`]:
//! the call gets a deadline, and transient failures (`StoreError::Unavailable`,
//! including a missed deadline) are retried with exponential backoff up to
//! `max_attempts`. Any other error is returned immediately.
//!
//! A missed deadline doesn't mean the store did nothing: the write may have
//! committed before its acknowledgement was lost. Strict writes therefore use
//! [`RetryPolicy::run_write`], which reports when a later attempt's answer may be
//! describing the effect of an earlier one.

use crate::config::RetryConfig;
use crate::db::StoreError;
use std::future::Future;
use std::time::Duration;

/// Result of a write run under the policy
#[derive(Debug, Clone, PartialEq)]
pub struct WriteOutcome<T> {
    pub result: Result<T, StoreError>,

    /// An attempt before the final one missed its deadline and may have been
    /// applied by the store
    pub uncertain: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub call_timeout: Duration,
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
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
            call_timeout: Duration::from_millis(config.call_timeout_ms),
        }
    }
}

impl RetryPolicy {
    /// Single attempt with the default deadline
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Backoff before retry number `retry` (0-based): initial * 2^retry, capped
    pub fn backoff_for(&self, retry: u32) -> Duration {
        let factor = 1u32.checked_shl(retry).unwrap_or(u32::MAX);
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }

    /// Run `call` under this policy
    ///
    /// `operation` names the call in log output.
    pub async fn run<T, F, Fut>(&self, operation: &str, call: F) -> Result<T, StoreError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        self.run_write(operation, call).await.result
    }

    /// Run a non-idempotent write under this policy
    ///
    /// Same retry behavior as [`run`](Self::run). When `uncertain` is set, a
    /// `Conflict` or `NotFound` from the final attempt may be the echo of an
    /// earlier attempt that committed; the caller resolves it by reading back.
    pub async fn run_write<T, F, Fut>(&self, operation: &str, mut call: F) -> WriteOutcome<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0;
        let mut uncertain = false;

        loop {
            attempt += 1;

            let (result, timed_out) = match tokio::time::timeout(self.call_timeout, call()).await {
                Ok(result) => (result, false),
                Err(_) => (
                    Err(StoreError::unavailable(format!(
                        "{} timed out after {:?}",
                        operation, self.call_timeout
                    ))),
                    true,
                ),
            };

            match result {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::debug!(
                            "{} succeeded after {} attempt(s)",
                            operation,
                            attempt
                        );
                    }
                    return WriteOutcome {
                        result: Ok(value),
                        uncertain,
                    };
                }
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    let backoff = self.backoff_for(attempt - 1);
                    tracing::warn!(
                        "{} failed (attempt {}/{}): {}; retrying in {:?}",
                        operation,
                        attempt,
                        max_attempts,
                        e,
                        backoff
                    );
                    uncertain |= timed_out;
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => {
                    if e.is_transient() {
                        tracing::warn!(
                            "{} failed after {} attempt(s): {}",
                            operation,
                            attempt,
                            e
                        );
                    }
                    return WriteOutcome {
                        result: Err(e),
                        uncertain,
                    };
                }
            }
        }
    }
}
