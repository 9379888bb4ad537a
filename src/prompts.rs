/// Prompt templates and user-facing strings for docsum
///
/// Templates use `{name}` placeholders filled by the functions below.

pub const SUMMARY_PROMPT: &str = r#"Summarize the following document text. Capture its purpose, main points and any conclusions in a few concise paragraphs.

=== Document ===
{text}
"#;

pub const COMPARISON_PROMPT: &str = "Compare the following two document summaries and decide which is more favorable.\n\
Document 1 Summary:\n{first}\n\n\
Document 2 Summary:\n{second}\n\n\
Respond with a verdict: 'Document 1', 'Document 2', or 'Indeterminate', and provide a brief justification.";

pub const VERDICT_UNAVAILABLE: &str = "Unable to generate verdict.";

pub fn summary_prompt(text: &str) -> String {
    SUMMARY_PROMPT.replace("{text}", text)
}

pub fn comparison_prompt(first: &str, second: &str) -> String {
    // `{second}` is substituted first so a literal "{second}" inside the
    // first summary is left untouched.
    COMPARISON_PROMPT
        .replace("{second}", second)
        .replacen("{first}", first, 1)
}

// CLI Messages
pub const MSG_SUMMARY_HEADER: &str = "📄 Summary";
pub const MSG_FIRST_HEADER: &str = "📄 Document 1";
pub const MSG_SECOND_HEADER: &str = "📄 Document 2";
pub const MSG_VERDICT_HEADER: &str = "⚖️  Verdict";
pub const MSG_EMPTY_DOCUMENT: &str = "No extractable text found in the document.";
pub const MSG_USAGE_UNKNOWN: &str = "usage not reported";
pub const MSG_CONFIG_HEADER: &str = "🔧 docsum configuration";
pub const MSG_INTERRUPTED: &str = "Interrupted";
