use anyhow::{Context, Result};
use async_trait::async_trait;
use common::SourceConfig;
use feed_rs::model::{Entry, Feed};
use feed_rs::parser;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::models::CandidateItem;
use crate::sanitize::to_plain_text;
use crate::scraping::PageSource;

pub const DEFAULT_USER_AGENT: &str = "Newsdigest/0.1.0";

/// A place candidate items come from (a feed, a listings page, ...).
#[async_trait]
pub trait Source: Send + Sync {
    fn label(&self) -> &str;

    /// Fetch every candidate the source currently offers, in source order.
    async fn fetch(&self) -> Result<Vec<CandidateItem>>;
}

/// Build the shared HTTP client used for feeds and pages.
pub fn build_http_client(timeout_secs: u64, user_agent: &str) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(user_agent)
        .build()
        .context("failed to build reqwest client")
}

/// Fetches a feed from the given URL and parses it. Single attempt, no retries.
pub async fn fetch_and_parse_feed(client: &Client, url: &str) -> Result<Feed> {
    let response = client.get(url).send().await.context("failed to fetch feed")?;

    let status = response.status();
    if !status.is_success() {
        return Err(anyhow::anyhow!("feed fetch failed with status: {}", status));
    }

    let bytes = response.bytes().await.context("failed to read response body")?;
    let feed = parser::parse(bytes.as_ref()).context("failed to parse feed")?;

    Ok(feed)
}

/// Convert feed entries to candidates, resolving links against `base`.
/// Entries without a usable title or link are skipped.
pub fn entries_to_candidates(entries: &[Entry], base: &Url, source: &str) -> Vec<CandidateItem> {
    let mut items = Vec::with_capacity(entries.len());

    for entry in entries {
        let title = entry
            .title
            .as_ref()
            .map(|t| to_plain_text(&t.content))
            .unwrap_or_default();
        if title.is_empty() {
            debug!(source, "skipping entry without title");
            continue;
        }

        let Some(href) = entry.links.first().map(|l| l.href.trim()).filter(|h| !h.is_empty()) else {
            debug!(source, title = %title, "skipping entry without link");
            continue;
        };
        let url = match base.join(href) {
            Ok(url) => url.to_string(),
            Err(e) => {
                debug!(source, href, "skipping entry with unresolvable link: {}", e);
                continue;
            }
        };

        // Summary first, embedded content as fallback
        let summary_html = entry
            .summary
            .as_ref()
            .map(|s| s.content.as_str())
            .filter(|s| !s.trim().is_empty())
            .or_else(|| entry.content.as_ref().and_then(|c| c.body.as_deref()))
            .unwrap_or_default();

        items.push(CandidateItem {
            title,
            url,
            summary: to_plain_text(summary_html),
            published_at: entry.published.or(entry.updated),
            source: source.to_string(),
        });
    }

    items
}

/// RSS/Atom source
pub struct FeedSource {
    url: String,
    label: String,
    client: Client,
}

impl FeedSource {
    pub fn new(url: impl Into<String>, label: Option<String>, client: Client) -> Self {
        let url = url.into();
        Self {
            label: label.unwrap_or_else(|| url.clone()),
            url,
            client,
        }
    }
}

#[async_trait]
impl Source for FeedSource {
    fn label(&self) -> &str {
        &self.label
    }

    async fn fetch(&self) -> Result<Vec<CandidateItem>> {
        let base = Url::parse(&self.url).context("invalid feed URL")?;
        let feed = fetch_and_parse_feed(&self.client, &self.url).await?;
        let items = entries_to_candidates(&feed.entries, &base, &self.label);
        info!(
            "Fetched feed '{}': {} entries, {} usable",
            self.label,
            feed.entries.len(),
            items.len()
        );
        Ok(items)
    }
}

/// Instantiate the configured sources, all sharing one client.
pub fn build_sources(configs: &[SourceConfig], client: &Client) -> Vec<Box<dyn Source>> {
    configs
        .iter()
        .map(|cfg| -> Box<dyn Source> {
            match cfg {
                SourceConfig::Feed { url, label } => {
                    Box::new(FeedSource::new(url.clone(), label.clone(), client.clone()))
                }
                SourceConfig::Page { url, label, selector } => Box::new(PageSource::new(
                    url.clone(),
                    label.clone(),
                    selector.clone(),
                    client.clone(),
                )),
            }
        })
        .collect()
}

#[derive(Debug, Default)]
pub struct FetchOutcome {
    pub items: Vec<CandidateItem>,
    pub succeeded: usize,
    pub failed: usize,
}

/// Query every source in list order. A failing source contributes nothing
/// and is logged; it never aborts the run.
pub async fn fetch_all(sources: &[Box<dyn Source>]) -> FetchOutcome {
    let mut outcome = FetchOutcome::default();

    for source in sources {
        match source.fetch().await {
            Ok(items) => {
                outcome.succeeded += 1;
                outcome.items.extend(items);
            }
            Err(e) => {
                outcome.failed += 1;
                warn!("source '{}' failed, skipping: {:#}", source.label(), e);
            }
        }
    }

    info!(
        "Fetched {} candidates from {}/{} sources",
        outcome.items.len(),
        outcome.succeeded,
        sources.len()
    );
    outcome
}
