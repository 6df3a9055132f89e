/*!
common/src/lib.rs

Shared configuration types for newsdigest.

This file provides:
- Config data structures (deserialized from TOML)
- An async loader that merges a default file with an optional override file
- Environment-style overrides and credential lookup, so secrets never live in the file
*/

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Run-level settings for one pipeline invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Label used in every block header (e.g. "Dubai-News")
    #[serde(default = "default_label")]
    pub label: String,
    /// Upper bound on items in the artifact, applied after dedup and sort
    #[serde(default = "default_max_articles")]
    pub max_articles: usize,
    /// Recency window in days; `None` disables the freshness filter
    #[serde(default = "default_recency_days")]
    pub recency_days: Option<i64>,
    /// Fixed offset used for the header date (Asia/Dubai is +04:00)
    #[serde(default = "default_utc_offset_minutes")]
    pub utc_offset_minutes: i32,
    /// strftime format for the header date
    #[serde(default = "default_date_format")]
    pub date_format: String,
    /// Emit only items tagged as breaking
    #[serde(default)]
    pub breaking_only: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            label: default_label(),
            max_articles: default_max_articles(),
            recency_days: default_recency_days(),
            utc_offset_minutes: default_utc_offset_minutes(),
            date_format: default_date_format(),
            breaking_only: false,
        }
    }
}

/// One configured source. Feeds are parsed as RSS/Atom, pages are scanned for anchors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SourceConfig {
    Feed {
        url: String,
        label: Option<String>,
    },
    Page {
        url: String,
        label: Option<String>,
        /// CSS selector matching the anchors to harvest
        #[serde(default = "default_anchor_selector")]
        selector: String,
    },
}

impl SourceConfig {
    pub fn url(&self) -> &str {
        match self {
            SourceConfig::Feed { url, .. } | SourceConfig::Page { url, .. } => url,
        }
    }

    /// Human-readable name for logs: the configured label, else the URL.
    pub fn display_label(&self) -> &str {
        match self {
            SourceConfig::Feed { label, url } | SourceConfig::Page { label, url, .. } => {
                label.as_deref().unwrap_or(url)
            }
        }
    }
}

/// Which relevance strategy a pipeline uses. The two are never combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterStrategyKind {
    /// Keep items mentioning one of `tokens` (e.g. a city name)
    Locale,
    /// Keep items mentioning one of `keywords` (e.g. "launch", "off-plan")
    Keywords,
}

/// Relevance and breaking-news classification settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    pub strategy: FilterStrategyKind,
    #[serde(default)]
    pub tokens: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default = "default_breaking_keywords")]
    pub breaking_keywords: Vec<String>,
}

impl FilterConfig {
    /// Terms of the active strategy only.
    pub fn active_terms(&self) -> &[String] {
        match self.strategy {
            FilterStrategyKind::Locale => &self.tokens,
            FilterStrategyKind::Keywords => &self.keywords,
        }
    }
}

/// What the enrichment step asks the text-generation service to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrichmentMode {
    #[default]
    Translate,
    Summarize,
}

/// Remote LLM config (OpenAI-compatible chat completions endpoint)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemoteLlmConfig {
    pub api_url: Option<String>,
    pub api_key_env: Option<String>,
    pub model: Option<String>,
    pub timeout_seconds: Option<u64>,
    pub max_tokens: Option<usize>,
    pub temperature: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub mode: EnrichmentMode,
    /// Target language for translation and summaries
    #[serde(default = "default_language")]
    pub language: String,
    /// Sentence budget in summarize mode
    #[serde(default = "default_sentences")]
    pub sentences: u32,
    /// Replaces the built-in system instruction when set
    pub system_prompt: Option<String>,
    pub remote: Option<RemoteLlmConfig>,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            mode: EnrichmentMode::default(),
            language: default_language(),
            sentences: default_sentences(),
            system_prompt: None,
            remote: None,
        }
    }
}

/// Persisted artifact settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_path")]
    pub path: String,
    /// First line of the file, written as `# <marker>`
    #[serde(default = "default_marker")]
    pub marker: String,
    /// Label of the trailing timestamp line
    #[serde(default = "default_generated_label")]
    pub generated_label: String,
    /// Prefix rendered instead of an ordinal for breaking items
    #[serde(default = "default_breaking_marker")]
    pub breaking_marker: String,
    /// Placeholder text when nothing survived classification
    #[serde(default = "default_empty_message")]
    pub empty_message: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: default_output_path(),
            marker: default_marker(),
            generated_label: default_generated_label(),
            breaking_marker: default_breaking_marker(),
            empty_message: default_empty_message(),
        }
    }
}

/// Telegram distribution settings. Token and chat id are read from the environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributionConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_telegram_api_base")]
    pub api_base: String,
    #[serde(default = "default_bot_token_env")]
    pub bot_token_env: String,
    #[serde(default = "default_chat_id_env")]
    pub chat_id_env: String,
    #[serde(default = "default_distribution_timeout")]
    pub timeout_seconds: u64,
}

impl Default for DistributionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_base: default_telegram_api_base(),
            bot_token_env: default_bot_token_env(),
            chat_id_env: default_chat_id_env(),
            timeout_seconds: default_distribution_timeout(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelegramCredentials {
    pub token: String,
    pub chat_id: String,
}

impl DistributionConfig {
    /// Resolve the bot token and chat id. Either one missing means "do not distribute".
    pub fn credentials<F>(&self, lookup: F) -> Option<TelegramCredentials>
    where
        F: Fn(&str) -> Option<String>,
    {
        let token = lookup(&self.bot_token_env)?;
        let chat_id = lookup(&self.chat_id_env)?;
        Some(TelegramCredentials { token, chat_id })
    }
}

/// Politeness / fetching configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolitenessConfig {
    pub fetch_timeout_seconds: Option<u64>,
    pub user_agent: Option<String>,
}

/// Top-level application configuration (deserialized from config.toml)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
    pub filter: FilterConfig,
    #[serde(default)]
    pub enrichment: EnrichmentConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub distribution: DistributionConfig,
    pub politeness: Option<PolitenessConfig>,
}

impl Config {
    /// Load configuration with an optional default file and an optional override file.
    /// If both are present, they are merged (override takes precedence).
    pub async fn load_with_defaults(default_path: Option<&Path>, override_path: Option<&Path>) -> Result<Self> {
        let mut config_value = toml::Value::Table(toml::map::Map::new());

        if let Some(path) = default_path {
            if path.exists() {
                let data = tokio::fs::read_to_string(path).await
                    .with_context(|| format!("Failed to read default config: {}", path.display()))?;
                let val: toml::Value = toml::from_str(&data)
                    .context("Failed to parse default configuration")?;
                merge_toml(&mut config_value, val);
            }
        }

        if let Some(path) = override_path {
            if path.exists() {
                let data = tokio::fs::read_to_string(path).await
                    .with_context(|| format!("Failed to read override config: {}", path.display()))?;
                let val: toml::Value = toml::from_str(&data)
                    .context("Failed to parse override configuration")?;
                merge_toml(&mut config_value, val);
            }
        }

        let cfg: Config = config_value.try_into().context("Failed to parse merged configuration")?;
        Ok(cfg)
    }

    /// Apply `DIGEST_*` overrides. `lookup` is usually [`env_lookup`]; tests pass a map.
    ///
    /// `DIGEST_RECENCY_DAYS=0` disables the freshness window.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("DIGEST_MAX_ARTICLES") {
            self.pipeline.max_articles = v
                .trim()
                .parse()
                .with_context(|| format!("DIGEST_MAX_ARTICLES is not a number: {v}"))?;
        }
        if let Some(v) = lookup("DIGEST_RECENCY_DAYS") {
            let days: i64 = v
                .trim()
                .parse()
                .with_context(|| format!("DIGEST_RECENCY_DAYS is not a number: {v}"))?;
            self.pipeline.recency_days = (days > 0).then_some(days);
        }
        if let Some(v) = lookup("DIGEST_ENRICHMENT") {
            self.enrichment.enabled = parse_flag("DIGEST_ENRICHMENT", &v)?;
        }
        if let Some(v) = lookup("DIGEST_BREAKING_ONLY") {
            self.pipeline.breaking_only = parse_flag("DIGEST_BREAKING_ONLY", &v)?;
        }
        if let Some(v) = lookup("DIGEST_OUTPUT_PATH") {
            self.output.path = v;
        }
        Ok(())
    }

    /// Reject configurations that cannot produce a meaningful run.
    pub fn validate(&self) -> Result<()> {
        if self.sources.is_empty() {
            anyhow::bail!("no sources configured");
        }
        for source in &self.sources {
            let parsed = url::Url::parse(source.url())
                .with_context(|| format!("source URL is not absolute: {}", source.url()))?;
            if parsed.scheme() != "http" && parsed.scheme() != "https" {
                anyhow::bail!("unsupported source URL scheme: {}", source.url());
            }
            if let SourceConfig::Page { selector, .. } = source {
                if selector.trim().is_empty() {
                    anyhow::bail!("page source {} has an empty selector", source.url());
                }
            }
        }
        if self.pipeline.max_articles == 0 {
            anyhow::bail!("pipeline.max_articles must be at least 1");
        }
        if self.filter.active_terms().iter().all(|t| t.trim().is_empty()) {
            anyhow::bail!(
                "filter strategy {:?} has no terms configured",
                self.filter.strategy
            );
        }
        Ok(())
    }
}

/// Process environment lookup that treats empty values as unset.
pub fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_flag(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => anyhow::bail!("{name} must be a boolean, got '{other}'"),
    }
}

fn merge_toml(a: &mut toml::Value, b: toml::Value) {
    match (a, b) {
        (toml::Value::Table(a_map), toml::Value::Table(b_map)) => {
            for (k, v) in b_map {
                if let Some(a_val) = a_map.get_mut(&k) {
                    merge_toml(a_val, v);
                } else {
                    a_map.insert(k, v);
                }
            }
        }
        (a_val, b_val) => *a_val = b_val,
    }
}

fn default_true() -> bool {
    true
}
fn default_label() -> String {
    "Dubai-News".to_string()
}
fn default_max_articles() -> usize {
    5
}
fn default_recency_days() -> Option<i64> {
    Some(30)
}
fn default_utc_offset_minutes() -> i32 {
    4 * 60
}
fn default_date_format() -> String {
    "%d. %B %Y".to_string()
}
fn default_anchor_selector() -> String {
    "a[href]".to_string()
}
fn default_breaking_keywords() -> Vec<String> {
    ["breaking", "explosion", "emergency"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
fn default_language() -> String {
    "German".to_string()
}
fn default_sentences() -> u32 {
    2
}
fn default_output_path() -> String {
    "news/digest.txt".to_string()
}
fn default_marker() -> String {
    "This file was generated automatically".to_string()
}
fn default_generated_label() -> String {
    "Generated at".to_string()
}
fn default_breaking_marker() -> String {
    "🚨 BREAKING: ".to_string()
}
fn default_empty_message() -> String {
    "No relevant items found.".to_string()
}
fn default_telegram_api_base() -> String {
    "https://api.telegram.org".to_string()
}
fn default_bot_token_env() -> String {
    "TELEGRAM_BOT_TOKEN".to_string()
}
fn default_chat_id_env() -> String {
    "TELEGRAM_CHAT_ID".to_string()
}
fn default_distribution_timeout() -> u64 {
    10
}
