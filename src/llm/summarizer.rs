use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::{ComparisonResult, Document, SummaryResult};
use crate::infra::Settings;
use crate::llm::{chunk, ChatModel, LlmError};
use crate::prompts;

/// Model parameters applied to every summarization call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationDefaults {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub chunk_size_chars: usize,
}

impl GenerationDefaults {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            model: settings.model.clone(),
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
            chunk_size_chars: settings.chunk_size_chars,
        }
    }
}

/// One side of a comparison could not be summarized.
#[derive(Debug, Error)]
#[error("failed to summarize {document}: {source}")]
pub struct CompareError {
    pub document: Document,
    #[source]
    pub source: LlmError,
}

pub struct Summarizer<M> {
    client: M,
    defaults: GenerationDefaults,
}

impl<M: ChatModel> Summarizer<M> {
    pub fn new(client: M, defaults: GenerationDefaults) -> Self {
        Self { client, defaults }
    }

    /// Summarize one document.
    ///
    /// Blank text returns [`SummaryResult::empty`] without calling the model.
    /// Text longer than the chunk budget is summarized chunk by chunk and the
    /// partial summaries are merged in order.
    pub async fn summarize(&self, text: &str) -> Result<SummaryResult, LlmError> {
        let text = text.trim();
        if text.is_empty() {
            debug!("empty document, skipping LLM call");
            return Ok(SummaryResult::empty());
        }

        let budget = self.defaults.chunk_size_chars;
        if text.chars().count() <= budget {
            return self.summarize_part(text).await;
        }

        let chunks = chunk(text, budget);
        info!(chunks = chunks.len(), budget, "document exceeds chunk budget, summarizing in parts");

        let mut parts = Vec::with_capacity(chunks.len());
        for (index, piece) in chunks.iter().enumerate() {
            debug!(part = index + 1, of = chunks.len(), "summarizing part");
            parts.push(self.summarize_part(piece).await?);
        }
        Ok(SummaryResult::merge(parts))
    }

    async fn summarize_part(&self, text: &str) -> Result<SummaryResult, LlmError> {
        self.client
            .invoke(
                &prompts::summary_prompt(text),
                &self.defaults.model,
                self.defaults.max_tokens,
                self.defaults.temperature,
            )
            .await
    }

    /// Summarize both documents concurrently, then ask for a verdict.
    ///
    /// A failed summary aborts the comparison and names the document. A failed
    /// verdict does not: the summaries are returned with a placeholder verdict.
    pub async fn compare(&self, first: &str, second: &str) -> Result<ComparisonResult, CompareError> {
        let (first, second) = tokio::try_join!(
            async {
                self.summarize(first).await.map_err(|source| CompareError {
                    document: Document::First,
                    source,
                })
            },
            async {
                self.summarize(second).await.map_err(|source| CompareError {
                    document: Document::Second,
                    source,
                })
            },
        )?;

        let prompt = prompts::comparison_prompt(&first.text, &second.text);
        let verdict = match self
            .client
            .invoke(
                &prompt,
                &self.defaults.model,
                self.defaults.max_tokens,
                self.defaults.temperature,
            )
            .await
        {
            Ok(verdict) => verdict,
            Err(err) => {
                warn!("verdict generation failed: {err}");
                SummaryResult::verdict_unavailable()
            }
        };

        Ok(ComparisonResult {
            first,
            second,
            verdict,
        })
    }
}
