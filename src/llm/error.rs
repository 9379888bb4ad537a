use std::time::Duration;
use thiserror::Error;

/// Failure kinds surfaced by the LLM invocation layer.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum LlmError {
    /// An attempt ran past its deadline and was abandoned.
    #[error("'{operation}' timed out after {:.2}s", elapsed.as_secs_f64())]
    Timeout {
        operation: String,
        elapsed: Duration,
    },

    /// The endpoint answered with a non-2xx status. `body` is already truncated.
    #[error("LLM API returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Connection-level failure (DNS, refused, reset).
    #[error("network error calling LLM API: {0}")]
    Network(String),

    /// 2xx response whose payload could not be interpreted.
    #[error("malformed LLM response: {0}")]
    Malformed(String),

    /// Every allowed attempt failed; wraps the last error.
    #[error("gave up after {attempts} attempts: {last}")]
    RetryExhausted {
        attempts: u32,
        #[source]
        last: Box<LlmError>,
    },
}

impl LlmError {
    /// Default retry predicate: transport-level failures are retried,
    /// structural and terminal ones are not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LlmError::Timeout { .. } | LlmError::Http { .. } | LlmError::Network(_)
        )
    }

    /// Retry predicate used when malformed responses are configured as retryable.
    pub fn is_retryable_or_malformed(&self) -> bool {
        self.is_retryable() || matches!(self, LlmError::Malformed(_))
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        // Never carry the URL; it may include provider query parameters.
        LlmError::Network(err.without_url().to_string())
    }
}
