use chrono::{DateTime, Duration, Utc};
use common::{FilterConfig, FilterStrategyKind};
use std::cmp::Ordering;

use crate::models::{CandidateItem, Classification};

/// Relevance test applied to title and summary. Terms are matched
/// case-insensitively as substrings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterStrategy {
    /// Locale/topic tokens such as a city name
    Locale(Vec<String>),
    /// Topic-keyword allowlist such as "launch" or "off-plan"
    Keywords(Vec<String>),
}

impl FilterStrategy {
    fn terms(&self) -> &[String] {
        match self {
            FilterStrategy::Locale(terms) | FilterStrategy::Keywords(terms) => terms,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Classifier {
    strategy: FilterStrategy,
    recency: Option<Duration>,
    breaking_keywords: Vec<String>,
}

impl Classifier {
    pub fn new(
        strategy: FilterStrategy,
        recency_days: Option<i64>,
        breaking_keywords: Vec<String>,
    ) -> Self {
        let strategy = match strategy {
            FilterStrategy::Locale(terms) => FilterStrategy::Locale(normalize_terms(terms)),
            FilterStrategy::Keywords(terms) => FilterStrategy::Keywords(normalize_terms(terms)),
        };
        Self {
            strategy,
            recency: recency_days.filter(|d| *d > 0).map(Duration::days),
            breaking_keywords: normalize_terms(breaking_keywords),
        }
    }

    pub fn from_config(cfg: &FilterConfig, recency_days: Option<i64>) -> Self {
        let strategy = match cfg.strategy {
            FilterStrategyKind::Locale => FilterStrategy::Locale(cfg.tokens.clone()),
            FilterStrategyKind::Keywords => FilterStrategy::Keywords(cfg.keywords.clone()),
        };
        Self::new(strategy, recency_days, cfg.breaking_keywords.clone())
    }

    pub fn strategy(&self) -> &FilterStrategy {
        &self.strategy
    }

    /// Topic/locale match on title or summary.
    pub fn is_relevant(&self, item: &CandidateItem) -> bool {
        let title = item.title.to_lowercase();
        let summary = item.summary.to_lowercase();
        self.strategy
            .terms()
            .iter()
            .any(|term| title.contains(term.as_str()) || summary.contains(term.as_str()))
    }

    /// Undated items are kept: a missing timestamp is not evidence of staleness.
    pub fn is_fresh(&self, item: &CandidateItem, now: DateTime<Utc>) -> bool {
        match (item.published_at, self.recency) {
            (Some(published), Some(window)) => published >= now - window,
            _ => true,
        }
    }

    pub fn classify(&self, item: &CandidateItem, now: DateTime<Utc>) -> bool {
        self.is_relevant(item) && self.is_fresh(item, now)
    }

    /// Keep relevant, fresh items, newest first; undated items follow in fetch order.
    pub fn select(&self, items: Vec<CandidateItem>, now: DateTime<Utc>) -> Vec<CandidateItem> {
        let mut kept: Vec<CandidateItem> = items
            .into_iter()
            .filter(|item| self.classify(item, now))
            .collect();
        sort_newest_first(&mut kept);
        kept
    }

    /// Breaking detection looks at the title only, on whole words.
    ///
    /// Relevance terms that embed an urgency keyword ("breaking ground") are
    /// masked first, so they never tag an item as breaking.
    pub fn classification(&self, title: &str) -> Classification {
        let mut title = title.to_lowercase();
        for term in self.strategy.terms() {
            let embeds_keyword = self
                .breaking_keywords
                .iter()
                .any(|kw| term != kw && term.contains(kw.as_str()));
            if embeds_keyword {
                title = title.replace(term.as_str(), " ");
            }
        }

        if self
            .breaking_keywords
            .iter()
            .any(|kw| contains_word(&title, kw))
        {
            Classification::Breaking
        } else {
            Classification::Normal
        }
    }
}

/// Stable: equal keys (and all undated items) keep their relative order.
pub fn sort_newest_first(items: &mut [CandidateItem]) {
    items.sort_by(|a, b| match (a.published_at, b.published_at) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}

/// `needle` occurs in `haystack` with no word character directly before or
/// after it. Hyphens count as word characters ("ground-breaking").
fn contains_word(haystack: &str, needle: &str) -> bool {
    haystack.match_indices(needle).any(|(start, m)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + m.len()..].chars().next();
        !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
    })
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-'
}

fn normalize_terms(terms: Vec<String>) -> Vec<String> {
    terms
        .into_iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}
