use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One discovered article or listing, before filtering.
///
/// `url` is the identity of an item: two candidates with the same URL are the
/// same item whatever their titles say.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateItem {
    pub title: String,
    /// Absolute URL, already resolved against the source's base URL
    pub url: String,
    /// Plain-text summary, empty when the source had none
    pub summary: String,
    pub published_at: Option<DateTime<Utc>>,
    /// Label of the source that produced the item (for logs)
    pub source: String,
}

impl CandidateItem {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            summary: String::new(),
            published_at: None,
            source: String::new(),
        }
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    pub fn with_published(mut self, published_at: DateTime<Utc>) -> Self {
        self.published_at = Some(published_at);
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }
}

/// Urgency tag derived from the title
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    #[default]
    Normal,
    Breaking,
}

/// Candidate plus the output of the enrichment step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedItem {
    pub item: CandidateItem,
    /// Enriched headline, or the original title on failure
    pub rendered_title: String,
    /// Enriched summary, or the original summary on failure
    pub rendered_text: String,
    pub classification: Classification,
}

impl EnrichedItem {
    /// Item whose text passes through untouched.
    pub fn verbatim(item: CandidateItem, classification: Classification) -> Self {
        Self {
            rendered_title: item.title.clone(),
            rendered_text: item.summary.clone(),
            item,
            classification,
        }
    }

    pub fn is_breaking(&self) -> bool {
        self.classification == Classification::Breaking
    }
}
