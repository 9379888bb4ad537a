use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::domain::{ComparisonResult, SummaryResult};
use crate::infra::{read_document, Settings, MAX_DOCUMENT_BYTES};
use crate::llm::{chunk, GenerationDefaults, LLMClient, Summarizer};
use crate::prompts::*;

#[derive(Parser)]
#[command(name = "docsum")]
#[command(about = "Summarize and compare documents with an LLM", long_about = None)]
#[command(version)]
pub struct Cli {
    /// YAML config file (defaults to ./.docsum.yml, then the user config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Summarize a UTF-8 text document ("-" reads stdin)
    Summarize {
        file: PathBuf,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Summarize two documents and ask which one is more favorable
    Compare {
        first: PathBuf,
        second: PathBuf,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show how a document would be split for the model
    Chunk {
        file: PathBuf,

        /// Chunk budget in characters (defaults to SUMMARY_CHUNK_SIZE_CHARS)
        #[arg(short, long)]
        size: Option<usize>,
    },

    /// Print the effective configuration with secrets masked
    Config,
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    let settings =
        Settings::load(cli.config.as_deref()).context("Failed to load configuration")?;
    init_tracing(&settings.log_level);
    debug!(?settings, "configuration loaded");

    let settings = &settings;
    let command = async move {
        match cli.command {
            Commands::Summarize { file, json } => summarize_command(settings, &file, json).await,
            Commands::Compare { first, second, json } => {
                compare_command(settings, &first, &second, json).await
            }
            Commands::Chunk { file, size } => chunk_command(settings, &file, size),
            Commands::Config => config_command(settings),
        }
    };

    // Dropping the command future on Ctrl-C aborts pending requests and backoff sleeps.
    tokio::select! {
        result = command => result,
        _ = tokio::signal::ctrl_c() => Err(anyhow::anyhow!(MSG_INTERRUPTED)),
    }
}

fn init_tracing(level: &str) {
    let default_filter = format!("docsum={level}");

    // Logs go to stderr so stdout stays clean for --json output.
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

fn build_summarizer(settings: &Settings) -> Result<Summarizer<LLMClient>> {
    let client = LLMClient::new(settings).context("Failed to create LLM client")?;
    Ok(Summarizer::new(client, GenerationDefaults::from_settings(settings)))
}

async fn summarize_command(settings: &Settings, file: &Path, json: bool) -> Result<()> {
    let text = read_document(file, MAX_DOCUMENT_BYTES)?;
    let summarizer = build_summarizer(settings)?;

    let result = summarizer
        .summarize(&text)
        .await
        .with_context(|| format!("Failed to generate summary for {}", file.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!("{}", MSG_SUMMARY_HEADER.bold());
    print_summary(&result);
    Ok(())
}

async fn compare_command(settings: &Settings, first: &Path, second: &Path, json: bool) -> Result<()> {
    let first_text = read_document(first, MAX_DOCUMENT_BYTES)?;
    let second_text = read_document(second, MAX_DOCUMENT_BYTES)?;
    let summarizer = build_summarizer(settings)?;

    let result = summarizer.compare(&first_text, &second_text).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&comparison_json(first, second, &result))?);
        return Ok(());
    }

    println!("{} {}", MSG_FIRST_HEADER.bold(), first.display().to_string().dimmed());
    print_summary(&result.first);
    println!();
    println!("{} {}", MSG_SECOND_HEADER.bold(), second.display().to_string().dimmed());
    print_summary(&result.second);
    println!();
    println!("{} {}", MSG_VERDICT_HEADER.bold(), result.verdict_label().to_string().green().bold());
    println!("{}", result.verdict.text);
    println!("{}", format_usage(&result.verdict).dimmed());
    Ok(())
}

fn chunk_command(settings: &Settings, file: &Path, size: Option<usize>) -> Result<()> {
    let budget = size.unwrap_or(settings.chunk_size_chars);
    anyhow::ensure!(budget > 0, "Chunk size must be greater than zero");

    let text = read_document(file, MAX_DOCUMENT_BYTES)?;
    let chunks = chunk(&text, budget);

    println!(
        "{} chunk(s) at {} characters from {}",
        chunks.len().to_string().bold(),
        budget,
        file.display()
    );
    for (index, piece) in chunks.iter().enumerate() {
        let preview: String = piece.chars().take(60).collect();
        let len = piece.chars().count();
        let marker = if len > budget { " (oversized word)".yellow().to_string() } else { String::new() };
        println!("{:>4}  {:>6} chars{}  {}", index + 1, len, marker, preview.dimmed());
    }
    Ok(())
}

fn config_command(settings: &Settings) -> Result<()> {
    println!("{}", MSG_CONFIG_HEADER.bold());
    for (key, value) in settings.masked() {
        println!("  {:<28} {}", key, value);
    }
    Ok(())
}

fn print_summary(result: &SummaryResult) {
    if result.text.is_empty() {
        println!("{}", MSG_EMPTY_DOCUMENT.yellow());
    } else {
        println!("{}", result.text);
    }
    println!("{}", format_usage(result).dimmed());
}

fn comparison_json(first: &Path, second: &Path, result: &ComparisonResult) -> serde_json::Value {
    serde_json::json!({
        "file1": first.display().to_string(),
        "file2": second.display().to_string(),
        "summary1": result.first,
        "summary2": result.second,
        "verdict": result.verdict,
        "verdict_label": result.verdict_label(),
    })
}

fn format_usage(result: &SummaryResult) -> String {
    match (result.prompt_tokens, result.completion_tokens, result.total_tokens) {
        (None, None, None) => MSG_USAGE_UNKNOWN.to_string(),
        (prompt, completion, total) => {
            let show = |v: Option<u32>| v.map_or_else(|| "?".to_string(), |v| v.to_string());
            let mut line = format!(
                "tokens: prompt {} / completion {} / total {}",
                show(prompt),
                show(completion),
                show(total)
            );
            if let Some(cost) = result.estimated_cost {
                line.push_str(&format!(" · est. cost ${cost:.6}"));
            }
            line
        }
    }
}
