use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use common::Config;
use tracing::{info, warn};

use crate::classify::Classifier;
use crate::dedup::{cap, dedupe};
use crate::distribute::{distribute, DistributionReport, Notifier, TelegramNotifier};
use crate::format::{Formatter, OutputBlock};
use crate::ingestion::{build_http_client, build_sources, fetch_all, Source, DEFAULT_USER_AGENT};
use crate::llm::{build_enricher, Enricher, Enrichment};
use crate::models::{CandidateItem, Classification, EnrichedItem};
use crate::storage::{render_artifact, ArtifactSink, FileSink};

/// Counters for one run
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub sources_ok: usize,
    pub sources_failed: usize,
    pub candidates: usize,
    pub relevant: usize,
    pub duplicates: usize,
    pub kept: usize,
    pub breaking: usize,
    pub enrichment_fallbacks: usize,
    pub blocks: usize,
    pub artifact: String,
    pub distribution: DistributionReport,
}

/// Fetch → classify → dedupe → cap → enrich → format → persist → distribute.
pub struct Pipeline {
    sources: Vec<Box<dyn Source>>,
    classifier: Classifier,
    enricher: Box<dyn Enricher>,
    formatter: Formatter,
    sink: Box<dyn ArtifactSink>,
    notifier: Option<Box<dyn Notifier>>,
    max_articles: usize,
    breaking_only: bool,
    marker: String,
    generated_label: String,
}

impl Pipeline {
    pub fn new(
        sources: Vec<Box<dyn Source>>,
        classifier: Classifier,
        enricher: Box<dyn Enricher>,
        formatter: Formatter,
        sink: Box<dyn ArtifactSink>,
    ) -> Self {
        let output = common::OutputConfig::default();
        Self {
            sources,
            classifier,
            enricher,
            formatter,
            sink,
            notifier: None,
            max_articles: common::PipelineConfig::default().max_articles,
            breaking_only: false,
            marker: output.marker,
            generated_label: output.generated_label,
        }
    }

    pub fn with_notifier(mut self, notifier: Box<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn with_max_articles(mut self, max_articles: usize) -> Self {
        self.max_articles = max_articles;
        self
    }

    pub fn breaking_only(mut self, breaking_only: bool) -> Self {
        self.breaking_only = breaking_only;
        self
    }

    pub fn with_artifact_labels(
        mut self,
        marker: impl Into<String>,
        generated_label: impl Into<String>,
    ) -> Self {
        self.marker = marker.into();
        self.generated_label = generated_label.into();
        self
    }

    /// Wire every stage from configuration. `lookup` resolves secrets
    /// (LLM key, Telegram token and chat id).
    pub fn from_config<F>(config: &Config, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let timeout = config
            .politeness
            .as_ref()
            .and_then(|p| p.fetch_timeout_seconds)
            .unwrap_or(10);
        let user_agent = config
            .politeness
            .as_ref()
            .and_then(|p| p.user_agent.as_deref())
            .unwrap_or(DEFAULT_USER_AGENT);
        let client = build_http_client(timeout, user_agent)?;

        let sources = build_sources(&config.sources, &client);
        let classifier = Classifier::from_config(&config.filter, config.pipeline.recency_days);
        let enricher = build_enricher(&config.enrichment, &lookup)?;
        let formatter = Formatter::from_config(&config.pipeline, &config.output)?;
        let sink = Box::new(FileSink::new(&config.output.path));

        let mut pipeline = Pipeline::new(sources, classifier, enricher, formatter, sink)
            .with_max_articles(config.pipeline.max_articles)
            .breaking_only(config.pipeline.breaking_only)
            .with_artifact_labels(
                config.output.marker.clone(),
                config.output.generated_label.clone(),
            );

        let dist = &config.distribution;
        if !dist.enabled {
            info!("Distribution disabled by configuration");
        } else if let Some(credentials) = dist.credentials(&lookup) {
            let notifier = TelegramNotifier::new(dist.api_base.clone(), credentials, dist.timeout_seconds)?;
            pipeline = pipeline.with_notifier(Box::new(notifier));
        } else {
            warn!(
                "{} or {} not set; distribution will be skipped",
                dist.bot_token_env, dist.chat_id_env
            );
        }

        Ok(pipeline)
    }

    /// Execute one run. Only a persistence failure is returned as an error;
    /// source, enrichment and distribution failures are logged and absorbed.
    pub async fn run(&self, now: DateTime<Utc>) -> Result<RunReport> {
        info!("Starting digest run over {} sources", self.sources.len());
        let mut report = RunReport::default();

        let fetched = fetch_all(&self.sources).await;
        report.sources_ok = fetched.succeeded;
        report.sources_failed = fetched.failed;
        report.candidates = fetched.items.len();

        let relevant = self.classifier.select(fetched.items, now);
        report.relevant = relevant.len();

        let mut unique = dedupe(relevant);
        report.duplicates = report.relevant - unique.len();

        if self.breaking_only {
            unique.retain(|item| self.classifier.classification(&item.title) == Classification::Breaking);
            info!("Breaking-only run: {} breaking items", unique.len());
        }

        let kept = cap(unique, self.max_articles);
        report.kept = kept.len();
        info!(
            "{} candidates, {} relevant, {} duplicates, {} kept (max {})",
            report.candidates, report.relevant, report.duplicates, report.kept, self.max_articles
        );

        let (enriched, fallbacks) = self.enrich_all(kept).await;
        report.enrichment_fallbacks = fallbacks;
        report.breaking = enriched.iter().filter(|i| i.is_breaking()).count();

        let date = self.formatter.local_date(now);
        let blocks = self.formatter.format(&date, &enriched);
        report.blocks = blocks.len();

        let artifact = render_artifact(&self.marker, &blocks, &self.generated_label, now);
        self.sink
            .write(&artifact)
            .await
            .with_context(|| format!("failed to persist artifact to {}", self.sink.location()))?;
        report.artifact = self.sink.location();

        report.distribution = self.distribute(&blocks).await;

        info!("Digest run complete: {:?}", report);
        Ok(report)
    }

    /// Enrich titles and summaries one item at a time, in order.
    async fn enrich_all(&self, items: Vec<CandidateItem>) -> (Vec<EnrichedItem>, usize) {
        let mut enriched = Vec::with_capacity(items.len());
        let mut fallbacks = 0;

        for item in items {
            let classification = self.classifier.classification(&item.title);

            let title = self.enricher.enrich(&item.title).await;
            let summary = if item.summary.trim().is_empty() {
                Enrichment::Rendered(String::new())
            } else {
                self.enricher.enrich(&item.summary).await
            };
            fallbacks += [&title, &summary].iter().filter(|e| e.is_fallback()).count();

            enriched.push(EnrichedItem {
                rendered_title: title.into_text(),
                rendered_text: summary.into_text(),
                item,
                classification,
            });
        }

        if fallbacks > 0 {
            warn!("{} enrichment calls fell back to the original text", fallbacks);
        }
        (enriched, fallbacks)
    }

    async fn distribute(&self, blocks: &[OutputBlock]) -> DistributionReport {
        match &self.notifier {
            Some(notifier) => distribute(notifier.as_ref(), blocks).await,
            None => {
                info!("No distribution endpoint configured; {} blocks not sent", blocks.len());
                DistributionReport::default()
            }
        }
    }
}
