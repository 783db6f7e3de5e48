use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

/// Default OpenAI-compatible API root.
pub const DEFAULT_API_BASE_URL: &str = "https://api.openai.com/v1";

/// Default system directive sent ahead of every user message.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a playful, flirty friend.";

/// Central configuration loaded from environment variables.
///
/// All secrets come from env vars (never hardcoded). The .env file
/// is loaded automatically at startup via dotenvy.
#[derive(Debug, Clone)]
pub struct Config {
    /// Bearer token for both the moderation and chat completion APIs.
    pub openai_api_key: String,
    /// API root, overridable for proxies and compatible servers.
    pub api_base_url: String,
    pub chat_model: String,
    pub moderation_model: String,
    /// Fixed system directive for every generation request.
    pub system_prompt: String,
    /// Requests allowed per client per window.
    pub rate_limit: u32,
    pub rate_window: Duration,
    /// Upper bound on message length, in characters.
    pub max_message_chars: usize,
    /// Optional JSON rule file replacing the built-in forbidden pairs.
    pub rules_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            openai_api_key: String::new(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            chat_model: "gpt-4o-mini".to_string(),
            moderation_model: "omni-moderation-latest".to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            rate_limit: 10,
            rate_window: Duration::from_secs(60),
            max_message_chars: 2000,
            rules_path: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Everything except the API key has a default. Numeric values that
    /// don't parse, or that would disable the relay, are reported instead
    /// of silently falling back.
    pub fn load() -> Result<Self> {
        let defaults = Self::default();

        let config = Self {
            openai_api_key: env::var("OPENAI_API_KEY").unwrap_or_default(),
            api_base_url: env::var("OPENAI_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_base_url),
            chat_model: env::var("CHATGUARD_CHAT_MODEL").unwrap_or(defaults.chat_model),
            moderation_model: env::var("CHATGUARD_MODERATION_MODEL")
                .unwrap_or(defaults.moderation_model),
            system_prompt: env::var("CHATGUARD_SYSTEM_PROMPT").unwrap_or(defaults.system_prompt),
            rate_limit: parse_var("CHATGUARD_RATE_LIMIT")?.unwrap_or(defaults.rate_limit),
            rate_window: parse_var::<u64>("CHATGUARD_RATE_WINDOW_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.rate_window),
            max_message_chars: parse_var("CHATGUARD_MAX_MESSAGE_CHARS")?
                .unwrap_or(defaults.max_message_chars),
            rules_path: env::var("CHATGUARD_RULES_PATH").ok().map(PathBuf::from),
        };
        config.require_usable_limits()?;
        Ok(config)
    }

    /// Reject limits that make the relay unusable: a zero window never
    /// limits (and can't drive the sweeper's interval), while a zero limit
    /// or message length rejects everything.
    pub fn require_usable_limits(&self) -> Result<()> {
        if self.rate_window.is_zero() {
            anyhow::bail!("CHATGUARD_RATE_WINDOW_SECS must be at least 1");
        }
        if self.rate_limit == 0 {
            anyhow::bail!("CHATGUARD_RATE_LIMIT must be at least 1");
        }
        if self.max_message_chars == 0 {
            anyhow::bail!("CHATGUARD_MAX_MESSAGE_CHARS must be at least 1");
        }
        Ok(())
    }

    /// Check that the OpenAI API key is configured.
    /// Call this before any operation that talks to the remote model or classifier.
    pub fn require_openai(&self) -> Result<()> {
        if self.openai_api_key.is_empty() {
            anyhow::bail!(
                "OPENAI_API_KEY not set. Add it to your .env file.\n\
                 Both moderation and chat generation need it."
            );
        }
        Ok(())
    }
}

/// Read and parse an optional numeric env var.
fn parse_var<T>(name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("{name} must be a number, got {raw:?}")),
        Err(_) => Ok(None),
    }
}
