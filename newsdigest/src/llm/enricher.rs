// Enrichment: translate or summarize item text through an LLM, never failing the run
use anyhow::Result;
use common::{EnrichmentConfig, EnrichmentMode};
use std::sync::Arc;
use tracing::{info, warn};

use super::remote::{RemoteLlmProvider, DEFAULT_API_URL, DEFAULT_MODEL};
use super::{LlmProvider, LlmRequest};

/// Outcome of one enrichment call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Enrichment {
    /// Text produced by the service (or passed through on purpose)
    Rendered(String),
    /// The service failed; `text` is the input, unchanged
    Fallback { text: String, reason: String },
}

impl Enrichment {
    pub fn text(&self) -> &str {
        match self {
            Enrichment::Rendered(text) | Enrichment::Fallback { text, .. } => text,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            Enrichment::Rendered(text) | Enrichment::Fallback { text, .. } => text,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Enrichment::Fallback { .. })
    }
}

/// Text transformation stage. Implementations must not fail: on any error
/// they hand back the input verbatim as [`Enrichment::Fallback`].
#[async_trait::async_trait]
pub trait Enricher: Send + Sync {
    async fn enrich(&self, text: &str) -> Enrichment;
}

/// What to ask the service for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnrichTask {
    Translate { language: String },
    Summarize { sentences: u32, language: String },
}

impl EnrichTask {
    pub fn from_config(cfg: &EnrichmentConfig) -> Self {
        match cfg.mode {
            EnrichmentMode::Translate => EnrichTask::Translate {
                language: cfg.language.clone(),
            },
            EnrichmentMode::Summarize => EnrichTask::Summarize {
                sentences: cfg.sentences.max(1),
                language: cfg.language.clone(),
            },
        }
    }

    pub fn system_instruction(&self) -> String {
        match self {
            EnrichTask::Translate { language } => format!(
                "You are a professional real-estate and news editor. Translate the user's text into {language}. \
                 Keep names, numbers and dates exact. Reply with the translation only, without quotes or commentary."
            ),
            EnrichTask::Summarize { sentences, language } => format!(
                "You are a news editor. Summarize the user's text in at most {sentences} sentence(s) in {language}. \
                 Use only facts from the text. Reply with the summary only, without lists, headings or commentary."
            ),
        }
    }
}

/// Enricher backed by an [`LlmProvider`], one request per call, no retries.
pub struct LlmEnricher {
    provider: Arc<dyn LlmProvider>,
    instruction: String,
    max_tokens: Option<usize>,
    temperature: Option<f32>,
}

impl LlmEnricher {
    pub fn new(provider: Arc<dyn LlmProvider>, task: &EnrichTask) -> Self {
        Self {
            provider,
            instruction: task.system_instruction(),
            max_tokens: None,
            temperature: None,
        }
    }

    /// Replace the built-in instruction.
    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = instruction.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Per-request temperature. Unset, the provider's default applies.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

#[async_trait::async_trait]
impl Enricher for LlmEnricher {
    async fn enrich(&self, text: &str) -> Enrichment {
        info!("enriching: {}...", preview(text));

        let request = LlmRequest {
            system: Some(self.instruction.clone()),
            prompt: text.to_string(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            timeout_seconds: None,
        };

        match self.provider.generate(request).await {
            Ok(response) => {
                info!(
                    "enriched: {}... ({} tokens)",
                    preview(&response.content),
                    response.usage.total_tokens
                );
                Enrichment::Rendered(response.content)
            }
            Err(e) => {
                warn!("LLM enrichment failed: {:#}, keeping original text", e);
                Enrichment::Fallback {
                    text: text.to_string(),
                    reason: format!("{:#}", e),
                }
            }
        }
    }
}

/// Used when enrichment is disabled: hands the text back untouched.
pub struct Passthrough;

#[async_trait::async_trait]
impl Enricher for Passthrough {
    async fn enrich(&self, text: &str) -> Enrichment {
        Enrichment::Rendered(text.to_string())
    }
}

/// Build the configured enricher. A disabled section, or a missing API key,
/// yields [`Passthrough`] so the run still completes.
pub fn build_enricher<F>(cfg: &EnrichmentConfig, lookup: F) -> Result<Box<dyn Enricher>>
where
    F: Fn(&str) -> Option<String>,
{
    if !cfg.enabled {
        info!("Enrichment disabled; items pass through untranslated");
        return Ok(Box::new(Passthrough));
    }

    let remote = cfg.remote.clone().unwrap_or_default();
    let api_key_env = remote.api_key_env.as_deref().unwrap_or("OPENAI_API_KEY");
    let Some(api_key) = lookup(api_key_env) else {
        warn!(
            "LLM API key env var '{}' not set; enrichment skipped for this run",
            api_key_env
        );
        return Ok(Box::new(Passthrough));
    };

    let model = remote.model.unwrap_or_else(|| DEFAULT_MODEL.to_string());
    let api_url = remote.api_url.unwrap_or_else(|| DEFAULT_API_URL.to_string());
    let timeout_secs = remote.timeout_seconds.unwrap_or(30);
    let max_tokens = remote.max_tokens.unwrap_or(500);
    let temperature = remote.temperature.unwrap_or(0.3);

    if url::Url::parse(&api_url).is_err() {
        anyhow::bail!("enrichment.remote.api_url is not a valid URL: {}", api_url);
    }

    info!("Enrichment provider initialized: {} ({:?})", model, cfg.mode);
    let provider: Arc<dyn LlmProvider> = Arc::new(
        RemoteLlmProvider::new(api_url, api_key, model).with_defaults(
            timeout_secs,
            max_tokens,
            temperature,
        ),
    );

    let task = EnrichTask::from_config(cfg);
    let mut enricher = LlmEnricher::new(provider, &task)
        .with_max_tokens(max_tokens)
        .with_temperature(temperature);
    if let Some(instruction) = cfg.system_prompt.as_ref().filter(|s| !s.trim().is_empty()) {
        enricher = enricher.with_instruction(instruction.clone());
    }
    Ok(Box::new(enricher))
}

fn preview(text: &str) -> String {
    text.chars().take(80).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{LlmResponse, UsageMetadata};
    use std::sync::Mutex;

    /// Echoes the prompt, or fails when it contains "FAIL".
    struct EchoProvider {
        seen_system: Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl LlmProvider for EchoProvider {
        async fn generate(&self, request: LlmRequest) -> Result<LlmResponse> {
            self.seen_system
                .lock()
                .unwrap()
                .push(request.system.clone().unwrap_or_default());
            if request.prompt.contains("FAIL") {
                anyhow::bail!("LLM API error 429 Too Many Requests: quota exceeded");
            }
            Ok(LlmResponse {
                content: format!("[de] {}", request.prompt),
                usage: UsageMetadata::default(),
                model: "echo".into(),
            })
        }
    }

    fn echo() -> Arc<EchoProvider> {
        Arc::new(EchoProvider {
            seen_system: Mutex::new(Vec::new()),
        })
    }

    #[tokio::test]
    async fn successful_call_is_rendered() {
        let provider = echo();
        let enricher = LlmEnricher::new(
            provider.clone(),
            &EnrichTask::Translate {
                language: "German".into(),
            },
        );

        let out = enricher.enrich("New tower launched").await;
        assert_eq!(out, Enrichment::Rendered("[de] New tower launched".into()));
        assert!(provider.seen_system.lock().unwrap()[0].contains("Translate the user's text into German"));
    }

    #[tokio::test]
    async fn failure_falls_back_to_input_verbatim() {
        let enricher = LlmEnricher::new(
            echo(),
            &EnrichTask::Summarize {
                sentences: 2,
                language: "German".into(),
            },
        );

        let out = enricher.enrich("FAIL this one").await;
        assert!(out.is_fallback());
        assert_eq!(out.text(), "FAIL this one");
        match out {
            Enrichment::Fallback { reason, .. } => assert!(reason.contains("429")),
            other => panic!("expected fallback, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn custom_instruction_replaces_builtin() {
        let provider = echo();
        let enricher = LlmEnricher::new(
            provider.clone(),
            &EnrichTask::Translate {
                language: "German".into(),
            },
        )
        .with_instruction("Du bist ein professioneller deutscher Immobilienredakteur.");

        enricher.enrich("x").await;
        assert_eq!(
            provider.seen_system.lock().unwrap()[0],
            "Du bist ein professioneller deutscher Immobilienredakteur."
        );
    }

    #[tokio::test]
    async fn passthrough_returns_input() {
        assert_eq!(
            Passthrough.enrich("unchanged").await,
            Enrichment::Rendered("unchanged".into())
        );
    }

    #[test]
    fn summarize_instruction_mentions_sentence_budget() {
        let task = EnrichTask::Summarize {
            sentences: 3,
            language: "English".into(),
        };
        assert!(task.system_instruction().contains("at most 3 sentence(s) in English"));
    }

    #[tokio::test]
    async fn missing_key_or_disabled_config_yields_passthrough() {
        let mut cfg = EnrichmentConfig::default();
        let enricher = build_enricher(&cfg, |_| None).unwrap();
        assert_eq!(enricher.enrich("a").await, Enrichment::Rendered("a".into()));

        cfg.enabled = false;
        let enricher = build_enricher(&cfg, |_| Some("key".into())).unwrap();
        assert_eq!(enricher.enrich("b").await, Enrichment::Rendered("b".into()));
    }
}
