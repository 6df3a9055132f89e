use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use tracing::{debug, info};
use url::Url;

use crate::ingestion::Source;
use crate::models::CandidateItem;
use crate::sanitize::collapse_whitespace;

/// HTML listings page. Every anchor matched by `selector` becomes a candidate
/// titled with its text and pointing at its resolved `href`.
pub struct PageSource {
    url: String,
    label: String,
    selector: String,
    client: Client,
}

impl PageSource {
    pub fn new(
        url: impl Into<String>,
        label: Option<String>,
        selector: impl Into<String>,
        client: Client,
    ) -> Self {
        let url = url.into();
        Self {
            label: label.unwrap_or_else(|| url.clone()),
            url,
            selector: selector.into(),
            client,
        }
    }
}

#[async_trait]
impl Source for PageSource {
    fn label(&self) -> &str {
        &self.label
    }

    async fn fetch(&self) -> Result<Vec<CandidateItem>> {
        let base = Url::parse(&self.url).context("invalid page URL")?;

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .context("failed to fetch page")?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow::anyhow!("page fetch failed with status: {}", status));
        }

        let html = response.text().await.context("failed to read response body")?;
        let items = extract_anchors(&html, &base, &self.selector, &self.label)?;
        info!("scraping: {} anchors harvested from '{}'", items.len(), self.label);
        Ok(items)
    }
}

/// Scan `html` for anchors matching `selector`.
///
/// Relative hrefs are resolved against `base`. Anchors without text, and
/// `javascript:`, `mailto:`, `tel:` or fragment-only links, are skipped.
pub fn extract_anchors(
    html: &str,
    base: &Url,
    selector: &str,
    source: &str,
) -> Result<Vec<CandidateItem>> {
    let selector = Selector::parse(selector)
        .map_err(|e| anyhow::anyhow!("invalid selector '{}': {:?}", selector, e))?;
    let document = Html::parse_document(html);

    let mut items = Vec::new();
    for element in document.select(&selector) {
        let Some(href) = element.value().attr("href").map(str::trim) else {
            continue;
        };
        if href.is_empty() || href.starts_with('#') || is_non_navigational(href) {
            continue;
        }

        let title = collapse_whitespace(&element.text().collect::<Vec<_>>().join(" "));
        if title.is_empty() {
            continue;
        }

        match base.join(href) {
            Ok(url) => items.push(CandidateItem::new(title, url.to_string()).with_source(source)),
            Err(e) => debug!(href, "scraping: cannot resolve href: {}", e),
        }
    }

    Ok(items)
}

fn is_non_navigational(href: &str) -> bool {
    let lower = href.to_ascii_lowercase();
    ["javascript:", "mailto:", "tel:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
}
