use std::str::FromStr;

use anyhow::{bail, Context, Result};

use crate::optimize::optimizer::OptimizeSettings;
use crate::resilience::{RetryOptions, TimeoutCategory, TimeoutTable};

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub groq_api_key: String,
    pub groq_api_url: String,
    pub llm_model: String,
    pub port: u16,
    pub rust_log: String,
    pub timeouts: TimeoutTable,
    pub optimize: OptimizeSettings,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes the process env.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let timeouts = timeout_table(&lookup)?;

        let retry = RetryOptions {
            max_retries: parse_or(&lookup, "LLM_MAX_RETRIES", 3)?,
            base_delay_ms: parse_or(&lookup, "LLM_BASE_DELAY_MS", 1000)?,
            max_delay_ms: parse_or(&lookup, "LLM_MAX_DELAY_MS", 10_000)?,
            timeout_ms: timeouts.base_ms(TimeoutCategory::Ai),
            operation_name: "llm rewrite".to_string(),
        };

        let optimize = OptimizeSettings {
            max_chunk_chars: parse_or(&lookup, "MAX_CHUNK_CHARS", 50_000)?,
            inter_chunk_delay_ms: parse_or(&lookup, "INTER_CHUNK_DELAY_MS", 1000)?,
            fail_fast: parse_or(&lookup, "CHUNK_FAIL_FAST", false)?,
            retry,
            timeouts: timeouts.clone(),
        };
        if optimize.max_chunk_chars == 0 {
            bail!("MAX_CHUNK_CHARS must be positive");
        }

        Ok(Config {
            groq_api_key: lookup("GROQ_API_KEY")
                .context("Required environment variable 'GROQ_API_KEY' is not set")?,
            groq_api_url: lookup("GROQ_API_URL")
                .unwrap_or_else(|| "https://api.groq.com/openai/v1".to_string()),
            llm_model: lookup("LLM_MODEL").unwrap_or_else(|| "llama-3.1-8b-instant".to_string()),
            port: parse_or(&lookup, "PORT", 8080)?,
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            timeouts,
            optimize,
        })
    }
}

fn timeout_table(lookup: &impl Fn(&str) -> Option<String>) -> Result<TimeoutTable> {
    let mut table = TimeoutTable::default();
    for category in TimeoutCategory::ALL {
        let key = format!("TIMEOUT_{}_MS", category.as_str().to_ascii_uppercase());
        let base_ms: u64 = parse_or(lookup, &key, table.base_ms(category))?;
        if base_ms == 0 {
            bail!("{key} must be positive");
        }
        table.set_base_ms(category, base_ms);
    }
    Ok(table)
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value: '{raw}'")),
        None => Ok(default),
    }
}
