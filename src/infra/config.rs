use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_ENDPOINT: &str = "https://openrouter.ai/api/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "tngtech/deepseek-r1t2-chimera:free";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("OPENROUTER_API_KEY is not set. Export it or add `api_key` to the config file")]
    MissingApiKey,

    #[error("invalid value {value:?} for {key}: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("failed to read config file {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Optional overrides read from a YAML config file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub timeout_secs: Option<u64>,
    pub max_retries: Option<u32>,
    pub chunk_size_chars: Option<usize>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub log_level: Option<String>,
    pub endpoint: Option<String>,
    pub prompt_rate_per_1k: Option<f64>,
    pub completion_rate_per_1k: Option<f64>,
    pub retry_malformed: Option<bool>,
}

/// Process-wide settings. Built once at startup and only read afterwards.
#[derive(Clone)]
pub struct Settings {
    pub api_key: String,
    pub model: String,
    pub timeout: Duration,
    pub max_retries: u32,
    pub chunk_size_chars: usize,
    pub temperature: f32,
    pub max_tokens: u32,
    pub log_level: String,
    pub endpoint: String,
    pub prompt_rate_per_1k: f64,
    pub completion_rate_per_1k: f64,
    pub retry_malformed: bool,
}

impl Settings {
    const LOCAL_CONFIG_FILE: &'static str = ".docsum.yml";

    /// Load from defaults, the config file (explicit, local, or user-level)
    /// and the process environment, in increasing precedence.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match config_path {
            Some(path) => Self::read_file(path)?,
            None => match Self::discover_file() {
                Some(path) => Self::read_file(&path)?,
                None => FileConfig::default(),
            },
        };

        Self::resolve(file, |key| std::env::var(key).ok())
    }

    fn discover_file() -> Option<PathBuf> {
        let local = PathBuf::from(Self::LOCAL_CONFIG_FILE);
        if local.exists() {
            return Some(local);
        }

        dirs::config_dir()
            .map(|dir| dir.join("docsum").join("config.yml"))
            .filter(|path| path.exists())
    }

    pub fn read_file(path: &Path) -> Result<FileConfig, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        if contents.trim().is_empty() {
            return Ok(FileConfig::default());
        }
        serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Combine file values with environment lookups; the environment wins.
    pub fn resolve(
        file: FileConfig,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let lookup = |key: &str| env(key).filter(|value| !value.trim().is_empty());

        let api_key = lookup("OPENROUTER_API_KEY")
            .or(file.api_key)
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .ok_or(ConfigError::MissingApiKey)?;

        let timeout_secs = parse_or(&lookup, "LLM_TIMEOUT_SECONDS", file.timeout_secs, 30u64)?;
        if timeout_secs == 0 {
            return Err(invalid("LLM_TIMEOUT_SECONDS", "0", "must be greater than zero"));
        }

        let chunk_size_chars =
            parse_or(&lookup, "SUMMARY_CHUNK_SIZE_CHARS", file.chunk_size_chars, 3000usize)?;
        if chunk_size_chars == 0 {
            return Err(invalid("SUMMARY_CHUNK_SIZE_CHARS", "0", "must be greater than zero"));
        }

        let temperature = parse_or(&lookup, "LLM_TEMPERATURE", file.temperature, 0.2f32)?;
        if !temperature.is_finite() || temperature < 0.0 {
            return Err(invalid(
                "LLM_TEMPERATURE",
                &temperature.to_string(),
                "must be a non-negative number",
            ));
        }

        let prompt_rate_per_1k =
            parse_or(&lookup, "LLM_PROMPT_RATE_PER_1K", file.prompt_rate_per_1k, 0.0015f64)?;
        let completion_rate_per_1k = parse_or(
            &lookup,
            "LLM_COMPLETION_RATE_PER_1K",
            file.completion_rate_per_1k,
            0.002f64,
        )?;

        Ok(Self {
            api_key,
            model: lookup("LLM_MODEL_NAME")
                .or(file.model)
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            timeout: Duration::from_secs(timeout_secs),
            max_retries: parse_or(&lookup, "LLM_MAX_RETRIES", file.max_retries, 3u32)?,
            chunk_size_chars,
            temperature,
            max_tokens: parse_or(&lookup, "LLM_MAX_TOKENS", file.max_tokens, 500u32)?,
            log_level: lookup("LOG_LEVEL")
                .or(file.log_level)
                .unwrap_or_else(|| "info".to_string())
                .to_lowercase(),
            endpoint: lookup("LLM_API_URL")
                .or(file.endpoint)
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            prompt_rate_per_1k,
            completion_rate_per_1k,
            retry_malformed: parse_or(&lookup, "LLM_RETRY_MALFORMED", file.retry_malformed, false)?,
        })
    }

    /// Settings as display pairs, with the credential masked.
    pub fn masked(&self) -> Vec<(&'static str, String)> {
        vec![
            ("OPENROUTER_API_KEY", mask_secret(&self.api_key)),
            ("LLM_MODEL_NAME", self.model.clone()),
            ("LLM_TIMEOUT_SECONDS", self.timeout.as_secs().to_string()),
            ("LLM_MAX_RETRIES", self.max_retries.to_string()),
            ("SUMMARY_CHUNK_SIZE_CHARS", self.chunk_size_chars.to_string()),
            ("LLM_TEMPERATURE", self.temperature.to_string()),
            ("LLM_MAX_TOKENS", self.max_tokens.to_string()),
            ("LOG_LEVEL", self.log_level.clone()),
            ("LLM_API_URL", self.endpoint.clone()),
            ("LLM_PROMPT_RATE_PER_1K", self.prompt_rate_per_1k.to_string()),
            ("LLM_COMPLETION_RATE_PER_1K", self.completion_rate_per_1k.to_string()),
            ("LLM_RETRY_MALFORMED", self.retry_malformed.to_string()),
        ]
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("api_key", &mask_secret(&self.api_key))
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .field("chunk_size_chars", &self.chunk_size_chars)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("log_level", &self.log_level)
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

/// Minimum length at which the head and tail of a secret are shown.
const MASK_REVEAL_MIN_CHARS: usize = 16;

/// Show only the first and last four characters of a secret. Shorter secrets
/// are fully hidden so the visible part never exceeds half the value.
pub fn mask_secret(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() < MASK_REVEAL_MIN_CHARS {
        return "****".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}****{tail}")
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    file_value: Option<T>,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| invalid(key, &raw, &e.to_string())),
        None => Ok(file_value.unwrap_or(default)),
    }
}

fn invalid(key: &'static str, value: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
