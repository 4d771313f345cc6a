//! Retry logic for calendar provider calls.
//!
//! Implements exponential backoff with jitter. Only transient provider errors
//! are retried; writes are never retried after a timeout because the backend
//! may already have stored the event.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;

use super::super::{CalendarProvider, CalendarRef, CreatedEvent, EventDraft};
use crate::error::ProviderError;
use crate::types::{BusyInterval, TimeWindow};

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts.
    pub max_retries: u32,
    /// Initial delay before first retry.
    pub initial_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Multiplier for exponential backoff.
    pub backoff_multiplier: f64,
    /// Whether to add jitter to delays.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Create a new retry policy.
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    /// Create a policy with no retries.
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// Create a conservative retry policy for rate-limited calendar APIs.
    pub fn conservative() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(120),
            backoff_multiplier: 3.0,
            jitter: true,
        }
    }

    /// Calculate the delay for a given attempt number.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base_delay = self.initial_delay.as_millis() as f64
            * self.backoff_multiplier.powi(attempt as i32);
        let capped_delay = base_delay.min(self.max_delay.as_millis() as f64);

        let final_delay = if self.jitter {
            let jitter_factor = rand::thread_rng().gen_range(0.5..1.5);
            capped_delay * jitter_factor
        } else {
            capped_delay
        };

        Duration::from_millis(final_delay as u64)
    }
}

/// Result of a retry operation.
#[derive(Debug)]
pub enum RetryResult<T> {
    /// Operation succeeded.
    Success(T),
    /// Operation failed, either permanently or after all retries.
    Failed {
        last_error: ProviderError,
        attempts: u32,
    },
}

impl<T> RetryResult<T> {
    pub fn into_result(self) -> Result<T, ProviderError> {
        match self {
            RetryResult::Success(value) => Ok(value),
            RetryResult::Failed { last_error, .. } => Err(last_error),
        }
    }
}

/// Execute an operation, retrying errors accepted by `retryable`.
///
/// A rate-limit error waits at least as long as the provider asked.
pub async fn with_retry_if<F, Fut, T, P>(
    policy: &RetryPolicy,
    retryable: P,
    mut operation: F,
) -> RetryResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
    P: Fn(&ProviderError) -> bool,
{
    let mut attempts = 0;

    loop {
        match operation().await {
            Ok(result) => return RetryResult::Success(result),
            Err(e) => {
                if !retryable(&e) {
                    return RetryResult::Failed {
                        last_error: e,
                        attempts,
                    };
                }

                attempts += 1;
                if attempts > policy.max_retries {
                    return RetryResult::Failed {
                        last_error: e,
                        attempts,
                    };
                }

                let mut delay = policy.delay_for_attempt(attempts - 1);
                if let ProviderError::RateLimited { retry_after_ms } = &e {
                    delay = delay.max(Duration::from_millis(*retry_after_ms));
                }
                tracing::debug!(
                    "Retry attempt {} after {:?}: {:?}",
                    attempts,
                    delay,
                    e
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Execute an operation, retrying every transient error.
pub async fn with_retry<F, Fut, T>(policy: &RetryPolicy, operation: F) -> RetryResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    with_retry_if(policy, ProviderError::is_transient, operation).await
}

/// Writes are safe to repeat only when the backend certainly stored nothing.
fn write_is_retryable(error: &ProviderError) -> bool {
    error.is_transient() && !matches!(error, ProviderError::Timeout)
}

/// Calendar provider decorator that retries transient failures.
pub struct RetryingCalendar<P> {
    inner: P,
    policy: RetryPolicy,
}

impl<P: CalendarProvider> RetryingCalendar<P> {
    pub fn new(inner: P, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }
}

#[async_trait]
impl<P: CalendarProvider> CalendarProvider for RetryingCalendar<P> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn fetch_busy_intervals(
        &self,
        calendar: &CalendarRef,
        window_hint: &TimeWindow,
    ) -> Result<Vec<BusyInterval>, ProviderError> {
        with_retry(&self.policy, || {
            self.inner.fetch_busy_intervals(calendar, window_hint)
        })
        .await
        .into_result()
    }

    async fn create_event(
        &self,
        calendar: &CalendarRef,
        draft: &EventDraft,
    ) -> Result<CreatedEvent, ProviderError> {
        with_retry_if(&self.policy, write_is_retryable, || {
            self.inner.create_event(calendar, draft)
        })
        .await
        .into_result()
    }

    async fn update_event(
        &self,
        calendar: &CalendarRef,
        event_id: &str,
        draft: &EventDraft,
    ) -> Result<CreatedEvent, ProviderError> {
        with_retry_if(&self.policy, write_is_retryable, || {
            self.inner.update_event(calendar, event_id, draft)
        })
        .await
        .into_result()
    }

    async fn delete_event(
        &self,
        calendar: &CalendarRef,
        event_id: &str,
    ) -> Result<(), ProviderError> {
        with_retry_if(&self.policy, write_is_retryable, || {
            self.inner.delete_event(calendar, event_id)
        })
        .await
        .into_result()
    }
}
