pub mod chunker;
pub mod client;
pub mod error;
pub mod resilience;
pub mod summarizer;

use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::SummaryResult;

#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Send one user prompt and return the trimmed reply with its usage
    async fn invoke(
        &self,
        prompt: &str,
        model: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<SummaryResult, LlmError>;
}

#[async_trait]
impl<T: ChatModel + ?Sized> ChatModel for Arc<T> {
    async fn invoke(
        &self,
        prompt: &str,
        model: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<SummaryResult, LlmError> {
        (**self).invoke(prompt, model, max_tokens, temperature).await
    }
}

pub use chunker::chunk;
pub use client::{LLMClient, Pricing};
pub use error::LlmError;
pub use resilience::{with_timeout, Resilient, RetryPolicy};
pub use summarizer::{CompareError, GenerationDefaults, Summarizer};
