use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info_span, warn, Instrument};
use uuid::Uuid;

use crate::domain::SummaryResult;
use crate::infra::{mask_secret, Settings};
use crate::llm::resilience::{Resilient, RetryPolicy};
use crate::llm::{ChatModel, LlmError};

/// Longest response body excerpt kept in errors and logs.
const BODY_SNIPPET_CHARS: usize = 400;

/// Per-1K-token rates used for the cost estimate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pricing {
    pub prompt_per_1k: f64,
    pub completion_per_1k: f64,
}

impl Pricing {
    pub fn estimate(&self, prompt_tokens: u32, completion_tokens: u32) -> f64 {
        prompt_tokens as f64 / 1000.0 * self.prompt_per_1k
            + completion_tokens as f64 / 1000.0 * self.completion_per_1k
    }
}

impl Default for Pricing {
    fn default() -> Self {
        Self {
            prompt_per_1k: 0.0015,
            completion_per_1k: 0.002,
        }
    }
}

/// Chat-completion client. Every call runs under a per-attempt deadline and
/// the configured retry policy.
#[derive(Clone)]
pub struct LLMClient {
    api_key: String,
    endpoint: String,
    pricing: Pricing,
    resilience: Resilient,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct OpenRouterRequest {
    model: String,
    messages: Vec<OpenRouterMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct OpenRouterMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct OpenRouterResponse {
    #[serde(default)]
    choices: Vec<OpenRouterChoice>,
    usage: Option<OpenRouterUsage>,
}

// Chat endpoints fill `message.content`; legacy completion endpoints fill `text`.
#[derive(Deserialize)]
struct OpenRouterChoice {
    message: Option<OpenRouterResponseMessage>,
    text: Option<String>,
}

#[derive(Deserialize)]
struct OpenRouterResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct OpenRouterUsage {
    prompt_tokens: Option<u32>,
    completion_tokens: Option<u32>,
    total_tokens: Option<u32>,
}

impl LLMClient {
    pub fn new(settings: &Settings) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.timeout)
            .build()
            .map_err(|e| LlmError::Network(format!("failed to build HTTP client: {e}")))?;

        let condition = if settings.retry_malformed {
            LlmError::is_retryable_or_malformed
        } else {
            LlmError::is_retryable
        };
        let policy = RetryPolicy::new()
            .with_max_retries(settings.max_retries)
            .with_retry_condition(condition);

        Ok(Self {
            api_key: settings.api_key.clone(),
            endpoint: settings.endpoint.clone(),
            pricing: Pricing {
                prompt_per_1k: settings.prompt_rate_per_1k,
                completion_per_1k: settings.completion_rate_per_1k,
            },
            resilience: Resilient::new("chat_completion", settings.timeout, policy),
            client,
        })
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.resilience = self.resilience.with_policy(policy);
        self
    }

    pub fn resilience(&self) -> &Resilient {
        &self.resilience
    }

    async fn send_once(&self, request: &OpenRouterRequest) -> Result<SummaryResult, LlmError> {
        debug!(key = %mask_secret(&self.api_key), "calling chat completions endpoint");

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| {
                let err = LlmError::from(e);
                warn!("{err}");
                err
            })?;

        let status = response.status();
        if !status.is_success() {
            let excerpt = error_body(response.text().await);
            error!(status = status.as_u16(), "LLM API returned HTTP {}: {}", status.as_u16(), excerpt);
            return Err(LlmError::Http {
                status: status.as_u16(),
                body: excerpt,
            });
        }

        let body = response.text().await.map_err(LlmError::from)?;
        let result = parse_completion(&body, &self.pricing).map_err(|err| {
            error!("{err}");
            err
        })?;
        debug!(chars = result.text.chars().count(), "LLM API returned summary");
        Ok(result)
    }
}

impl std::fmt::Debug for LLMClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LLMClient")
            .field("api_key", &mask_secret(&self.api_key))
            .field("endpoint", &self.endpoint)
            .field("pricing", &self.pricing)
            .field("resilience", &self.resilience)
            .finish()
    }
}

#[async_trait]
impl ChatModel for LLMClient {
    async fn invoke(
        &self,
        prompt: &str,
        model: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<SummaryResult, LlmError> {
        let request = OpenRouterRequest {
            model: model.to_string(),
            messages: vec![OpenRouterMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            max_tokens,
            temperature,
        };

        let span = info_span!("llm_call", call_id = %Uuid::new_v4(), model);
        self.resilience
            .run(|| self.send_once(&request))
            .instrument(span)
            .await
    }
}

/// Interpret a 2xx chat-completion body.
fn parse_completion(body: &str, pricing: &Pricing) -> Result<SummaryResult, LlmError> {
    let response: OpenRouterResponse = serde_json::from_str(body).map_err(|e| {
        LlmError::Malformed(format!(
            "invalid JSON ({e}): {}",
            snippet(body, BODY_SNIPPET_CHARS)
        ))
    })?;

    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::Malformed("response has no choices".to_string()))?;

    let content = choice
        .message
        .and_then(|m| m.content)
        .or(choice.text)
        .ok_or_else(|| {
            LlmError::Malformed("first choice has no 'message.content' or 'text'".to_string())
        })?;

    let mut result = SummaryResult::text_only(content.trim());
    if let Some(usage) = response.usage {
        result.prompt_tokens = usage.prompt_tokens;
        result.completion_tokens = usage.completion_tokens;
        result.total_tokens = usage.total_tokens;
        result.estimated_cost = usage
            .prompt_tokens
            .zip(usage.completion_tokens)
            .map(|(prompt, completion)| pricing.estimate(prompt, completion));
    }
    Ok(result)
}

/// Excerpt of a non-2xx body, or a note when the body itself could not be read.
fn error_body<E: std::fmt::Display>(read: Result<String, E>) -> String {
    match read {
        Ok(body) => snippet(&body, BODY_SNIPPET_CHARS),
        Err(e) => {
            debug!("failed to read error response body: {e}");
            format!("<body unavailable: {e}>")
        }
    }
}

/// First `max` characters of `body`, ending in "..." when cut.
fn snippet(body: &str, max: usize) -> String {
    if body.chars().count() <= max {
        return body.to_string();
    }
    let mut cut: String = body.chars().take(max.saturating_sub(3)).collect();
    cut.push_str("...");
    cut
}
