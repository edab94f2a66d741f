use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub chat: ChatConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout. Unset means requests run until the server
    /// answers or the connection fails.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: None,
        }
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChatConfig {
    #[serde(default = "default_top_k")]
    pub top_k: u32,
    #[serde(default = "default_fallback_answer")]
    pub fallback_answer: String,
    #[serde(default)]
    pub pending: PendingPolicy,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            fallback_answer: default_fallback_answer(),
            pending: PendingPolicy::default(),
        }
    }
}

fn default_top_k() -> u32 {
    5
}
fn default_fallback_answer() -> String {
    "no answer found in the documents".to_string()
}

/// What happens to a question still in flight when a new one is asked.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PendingPolicy {
    /// Both requests run independently; their answers land in arrival order.
    #[default]
    Parallel,
    /// The older request is cancelled as soon as the new one is issued.
    CancelPrevious,
}

impl Config {
    /// Defaults used when no config file exists.
    pub fn minimal() -> Self {
        Self {
            api: ApiConfig::default(),
            chat: ChatConfig::default(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "config file not found, using defaults");
        return Ok(Config::minimal());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config = parse_config(&content)?;
    validate(&config)?;
    Ok(config)
}

pub fn parse_config(content: &str) -> Result<Config> {
    toml::from_str(content).with_context(|| "Failed to parse config file")
}

pub fn validate(config: &Config) -> Result<()> {
    if config.chat.top_k == 0 {
        anyhow::bail!("chat.top_k must be >= 1");
    }

    let base = config.api.base_url.trim();
    if base.is_empty() {
        anyhow::bail!("api.base_url must not be empty");
    }
    if !(base.starts_with("http://") || base.starts_with("https://")) {
        anyhow::bail!(
            "api.base_url must start with http:// or https://, got '{}'",
            base
        );
    }

    if config.api.timeout_secs == Some(0) {
        anyhow::bail!("api.timeout_secs must be > 0 when set");
    }

    Ok(())
}
