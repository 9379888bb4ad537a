//! Deadline and retry handling around a single asynchronous operation.
//!
//! Each attempt is raced against its own deadline; failed attempts that the
//! policy considers retryable are repeated with exponential backoff and jitter.
//! All retry state lives on the stack of one `run` call, so concurrent callers
//! never share a backoff schedule.

use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{error, warn};

use crate::llm::LlmError;

/// Retry policy configuration.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt; total attempts are `max_retries + 1`.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Multiplier applied to the delay after each retry.
    pub backoff_factor: f64,
    /// Uniform perturbation applied to every delay, in both directions.
    pub jitter: Duration,
    /// Decides which errors are worth another attempt.
    pub retry_condition: fn(&LlmError) -> bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(1),
            backoff_factor: 2.0,
            jitter: Duration::from_millis(100),
            retry_condition: LlmError::is_retryable,
        }
    }
}

impl RetryPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub const fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub const fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub const fn with_backoff_factor(mut self, factor: f64) -> Self {
        self.backoff_factor = factor;
        self
    }

    pub const fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn with_retry_condition(mut self, condition: fn(&LlmError) -> bool) -> Self {
        self.retry_condition = condition;
        self
    }

    pub fn should_retry(&self, error: &LlmError) -> bool {
        (self.retry_condition)(error)
    }

    /// Total number of attempts this policy allows.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Un-jittered delay between attempt `attempt` and `attempt + 1` (zero-based).
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let secs = self.initial_delay.as_secs_f64()
            * self.backoff_factor.powi(attempt.min(i32::MAX as u32) as i32);
        duration_from_secs(secs)
    }

    /// Jittered delay between attempt `attempt` and `attempt + 1`, never negative.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base = self.base_delay(attempt).as_secs_f64();
        let jitter = self.jitter.as_secs_f64();
        let offset = if jitter > 0.0 {
            rand::thread_rng().gen_range(-jitter..=jitter)
        } else {
            0.0
        };
        duration_from_secs(base + offset)
    }
}

fn duration_from_secs(secs: f64) -> Duration {
    if secs.is_finite() && secs > 0.0 {
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    } else if secs.is_infinite() && secs > 0.0 {
        Duration::MAX
    } else {
        Duration::ZERO
    }
}

/// Race `fut` against a deadline. The future is dropped when the deadline wins.
pub async fn with_timeout<F, T>(operation: &str, timeout: Duration, fut: F) -> Result<T, LlmError>
where
    F: Future<Output = Result<T, LlmError>>,
{
    let started = Instant::now();
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => {
            let elapsed = started.elapsed();
            error!(
                operation,
                elapsed_ms = elapsed.as_millis() as u64,
                "operation timed out after {:.2}s",
                timeout.as_secs_f64()
            );
            Err(LlmError::Timeout {
                operation: operation.to_string(),
                elapsed,
            })
        }
    }
}

/// Deadline plus retry policy, applicable to any async operation.
#[derive(Debug, Clone)]
pub struct Resilient {
    operation: String,
    timeout: Duration,
    policy: RetryPolicy,
}

impl Resilient {
    pub fn new(operation: impl Into<String>, timeout: Duration, policy: RetryPolicy) -> Self {
        Self {
            operation: operation.into(),
            timeout,
            policy,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Run `operation`, building a fresh future for every attempt.
    ///
    /// Non-retryable errors are returned as-is on first occurrence. When the
    /// last allowed attempt fails, the error is wrapped in
    /// [`LlmError::RetryExhausted`].
    pub async fn run<F, Fut, T>(&self, mut operation: F) -> Result<T, LlmError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, LlmError>>,
    {
        let max_attempts = self.policy.max_attempts();
        let started = Instant::now();
        let mut attempt = 0u32;

        loop {
            let error = match with_timeout(&self.operation, self.timeout, operation()).await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };
            attempt += 1;

            if !self.policy.should_retry(&error) {
                return Err(error);
            }

            if attempt >= max_attempts {
                error!(
                    operation = %self.operation,
                    attempts = attempt,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "giving up: {error}"
                );
                return Err(LlmError::RetryExhausted {
                    attempts: attempt,
                    last: Box::new(error),
                });
            }

            let delay = self.policy.delay_for(attempt - 1);
            warn!(
                operation = %self.operation,
                attempt,
                max_attempts,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "attempt failed: {error}; retrying in {:.2}s",
                delay.as_secs_f64()
            );
            sleep(delay).await;
        }
    }
}
