//! Document summarization and comparison backed by a chat-completion LLM.

pub mod cli;
pub mod domain;
pub mod infra;
pub mod llm;
pub mod prompts;
