/*!
common/src/lib.rs

Shared configuration types and reference data for financebot.

This file provides:
- The immutable run configuration, read once from the process environment
- The feed catalog (categories of RSS sources), see [`catalog`]
*/

use anyhow::{bail, Context, Result};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub mod catalog;

pub use catalog::{Category, FeedCatalog, FeedSource};

/// Browser-like User-Agent sent with every feed and article request.
/// Several finance sites reject obviously automated clients.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

pub const DEFAULT_BASE_URL: &str = "https://api.deepseek.com/v1";
pub const DEFAULT_MODEL: &str = "deepseek-chat";
pub const DEFAULT_PUSH_URL_TEMPLATE: &str = "https://sctapi.ftqq.com/{key}.send";

/// AI completion service settings
#[derive(Clone)]
pub struct LlmSettings {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout_seconds: u64,
}

impl fmt::Debug for LlmSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmSettings")
            .field("api_key", &mask_secret(&self.api_key))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

/// Delivery (push) settings
#[derive(Clone)]
pub struct PushSettings {
    /// One push per key, in the configured order
    pub keys: Vec<String>,
    /// Endpoint URL with a `{key}` placeholder
    pub url_template: String,
}

impl PushSettings {
    pub fn endpoint_for(&self, key: &str) -> String {
        self.url_template.replace("{key}", key)
    }
}

impl fmt::Debug for PushSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let masked: Vec<String> = self.keys.iter().map(|k| mask_secret(k)).collect();
        f.debug_struct("PushSettings")
            .field("keys", &masked)
            .field("url_template", &self.url_template)
            .finish()
    }
}

/// Feed fetching configuration
#[derive(Debug, Clone)]
pub struct FetchSettings {
    /// Total attempts per feed (not additional retries)
    pub retries: u32,
    pub retry_delay_seconds: u64,
    pub timeout_seconds: u64,
    pub user_agent: String,
}

/// Per-run content limits
#[derive(Debug, Clone)]
pub struct Limits {
    pub max_per_source_full: usize,
    pub max_per_source_lite: usize,
    pub article_max_len: usize,
    pub entry_delay_ms: u64,
    pub report_max_chars: usize,
}

impl Limits {
    pub fn entry_delay(&self) -> Duration {
        Duration::from_millis(self.entry_delay_ms)
    }
}

/// Top-level application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub llm: LlmSettings,
    pub push: PushSettings,
    pub fetch: FetchSettings,
    pub limits: Limits,
}

impl Config {
    /// Build the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    ///
    /// Blank values count as absent. The error names the variable at fault.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let api_key = get("DEEPSEEK_API_KEY")
            .or_else(|| get("OPENAI_API_KEY"))
            .context("no AI credential configured: set DEEPSEEK_API_KEY (preferred) or OPENAI_API_KEY")?;

        let keys: Vec<String> = get("SERVER_CHAN_KEYS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|k| !k.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        if keys.is_empty() {
            bail!("SERVER_CHAN_KEYS is not set: provide at least one comma-separated push key");
        }

        let url_template = get("PUSH_URL_TEMPLATE").unwrap_or_else(|| DEFAULT_PUSH_URL_TEMPLATE.to_string());
        if !url_template.contains("{key}") {
            bail!("PUSH_URL_TEMPLATE must contain a {{key}} placeholder, got '{}'", url_template);
        }

        let max_per_source_full = match get("MAX_PER_SOURCE_FULL") {
            Some(_) => parse_number(&get, "MAX_PER_SOURCE_FULL", 5, false)?,
            None => parse_number(&get, "MAX_PER_SOURCE", 5, false)?,
        };

        Ok(Config {
            llm: LlmSettings {
                api_key,
                base_url: get("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
                model: get("LLM_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
                timeout_seconds: parse_number(&get, "LLM_TIMEOUT_SECS", 120, false)?,
            },
            push: PushSettings { keys, url_template },
            fetch: FetchSettings {
                retries: parse_number(&get, "FEED_RETRIES", 3, false)?,
                retry_delay_seconds: parse_number(&get, "FEED_RETRY_DELAY_SECS", 5, true)?,
                timeout_seconds: 20,
                user_agent: BROWSER_USER_AGENT.to_string(),
            },
            limits: Limits {
                max_per_source_full,
                max_per_source_lite: parse_number(&get, "MAX_PER_SOURCE_LITE", 8, false)?,
                article_max_len: parse_number(&get, "ARTICLE_MAX_LEN", 1500, false)?,
                entry_delay_ms: parse_number(&get, "ENTRY_DELAY_MS", 300, true)?,
                report_max_chars: parse_number(&get, "REPORT_MAX_CHARS", 1800, false)?,
            },
        })
    }
}

fn parse_number<T, G>(get: &G, key: &str, default: T, allow_zero: bool) -> Result<T>
where
    T: FromStr + Default + PartialEq,
    G: Fn(&str) -> Option<String>,
{
    let Some(raw) = get(key) else {
        return Ok(default);
    };
    let value: T = raw
        .parse()
        .ok()
        .with_context(|| format!("{} must be a non-negative integer, got '{}'", key, raw))?;
    if !allow_zero && value == T::default() {
        bail!("{} must be greater than zero", key);
    }
    Ok(value)
}

/// Keep only the first few characters of a credential for logs.
pub fn mask_secret(secret: &str) -> String {
    let visible: String = secret.chars().take(6).collect();
    if visible.chars().count() == secret.chars().count() {
        "***".to_string()
    } else {
        format!("{}***", visible)
    }
}
