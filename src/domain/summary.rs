use serde::{Deserialize, Serialize};
use std::fmt;

use crate::prompts::VERDICT_UNAVAILABLE;

/// Text produced by one summarization (or verdict) call, plus usage when the
/// provider reported it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SummaryResult {
    #[serde(rename = "summary")]
    pub text: String,
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
    pub total_tokens: Option<u32>,
    pub estimated_cost: Option<f64>,
}

impl SummaryResult {
    /// Result carrying text only; usage stays absent.
    pub fn text_only(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Result for an empty document: no call was made, so usage is zero.
    pub fn empty() -> Self {
        Self {
            text: String::new(),
            prompt_tokens: Some(0),
            completion_tokens: Some(0),
            total_tokens: Some(0),
            estimated_cost: Some(0.0),
        }
    }

    /// Stand-in verdict used when the comparison call fails.
    pub fn verdict_unavailable() -> Self {
        Self::text_only(VERDICT_UNAVAILABLE)
    }

    /// Fold partial results into one, joining texts with blank lines.
    /// A usage field is kept only when every part reported it.
    pub fn merge(parts: Vec<SummaryResult>) -> Self {
        let mut merged = SummaryResult {
            text: String::new(),
            prompt_tokens: Some(0),
            completion_tokens: Some(0),
            total_tokens: Some(0),
            estimated_cost: Some(0.0),
        };
        let mut texts = Vec::with_capacity(parts.len());

        for part in parts {
            merged.prompt_tokens = add(merged.prompt_tokens, part.prompt_tokens);
            merged.completion_tokens = add(merged.completion_tokens, part.completion_tokens);
            merged.total_tokens = add(merged.total_tokens, part.total_tokens);
            merged.estimated_cost = merged
                .estimated_cost
                .zip(part.estimated_cost)
                .map(|(a, b)| a + b);
            texts.push(part.text);
        }

        merged.text = texts.join("\n\n");
        merged
    }
}

fn add(a: Option<u32>, b: Option<u32>) -> Option<u32> {
    a.zip(b).map(|(a, b)| a.saturating_add(b))
}

/// Which side of a comparison something refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Document {
    First,
    Second,
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Document::First => write!(f, "Document 1"),
            Document::Second => write!(f, "Document 2"),
        }
    }
}

/// Outcome label extracted from a verdict text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    #[serde(rename = "Document 1")]
    Document1,
    #[serde(rename = "Document 2")]
    Document2,
    Indeterminate,
}

impl Verdict {
    /// Earliest label mentioned in `text` wins; no label means indeterminate.
    pub fn detect(text: &str) -> Self {
        let lower = text.to_lowercase();
        [
            (Verdict::Document1, "document 1"),
            (Verdict::Document2, "document 2"),
            (Verdict::Indeterminate, "indeterminate"),
        ]
        .into_iter()
        .filter_map(|(verdict, label)| lower.find(label).map(|pos| (pos, verdict)))
        .min_by_key(|(pos, _)| *pos)
        .map(|(_, verdict)| verdict)
        .unwrap_or(Verdict::Indeterminate)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Document1 => write!(f, "Document 1"),
            Verdict::Document2 => write!(f, "Document 2"),
            Verdict::Indeterminate => write!(f, "Indeterminate"),
        }
    }
}

/// Both summaries and the verdict produced by a comparison.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComparisonResult {
    #[serde(rename = "summary1")]
    pub first: SummaryResult,
    #[serde(rename = "summary2")]
    pub second: SummaryResult,
    pub verdict: SummaryResult,
}

impl ComparisonResult {
    pub fn verdict_label(&self) -> Verdict {
        Verdict::detect(&self.verdict.text)
    }
}
