use anyhow::{Context, Result};
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, FixedOffset, Utc};
use common::{OutputConfig, PipelineConfig};

use crate::models::EnrichedItem;

/// One unit of the artifact and of distribution: one message per block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputBlock {
    /// `"<Label> – <date>"`
    pub header: String,
    /// `"1. "`, `"2. "`, ... or the breaking marker; empty for the placeholder
    pub prefix: String,
    /// Title, summary and URL on separate lines, or the placeholder message
    pub body: String,
}

impl OutputBlock {
    pub fn render(&self) -> String {
        format!("{}\n\n{}{}", self.header, self.prefix, self.body)
    }
}

#[derive(Debug, Clone)]
pub struct Formatter {
    label: String,
    date_format: String,
    offset: FixedOffset,
    breaking_marker: String,
    empty_message: String,
}

impl Formatter {
    pub fn new(
        label: impl Into<String>,
        date_format: impl Into<String>,
        utc_offset_minutes: i32,
        breaking_marker: impl Into<String>,
        empty_message: impl Into<String>,
    ) -> Result<Self> {
        let date_format = date_format.into();
        if StrftimeItems::new(&date_format).any(|item| matches!(item, Item::Error)) {
            anyhow::bail!("invalid date format: {}", date_format);
        }
        let offset = utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .with_context(|| format!("UTC offset out of range: {} minutes", utc_offset_minutes))?;

        Ok(Self {
            label: label.into(),
            date_format,
            offset,
            breaking_marker: breaking_marker.into(),
            empty_message: empty_message.into(),
        })
    }

    pub fn from_config(pipeline: &PipelineConfig, output: &OutputConfig) -> Result<Self> {
        Self::new(
            pipeline.label.clone(),
            pipeline.date_format.clone(),
            pipeline.utc_offset_minutes,
            output.breaking_marker.clone(),
            output.empty_message.clone(),
        )
    }

    /// Header date in the configured local offset.
    pub fn local_date(&self, now: DateTime<Utc>) -> String {
        now.with_timezone(&self.offset)
            .format(&self.date_format)
            .to_string()
    }

    pub fn header(&self, date: &str) -> String {
        format!("{} – {}", self.label, date)
    }

    /// Breaking items first (marker prefix), then the rest numbered from 1.
    /// Never returns an empty list.
    pub fn format(&self, date: &str, items: &[EnrichedItem]) -> Vec<OutputBlock> {
        let header = self.header(date);

        if items.is_empty() {
            return vec![OutputBlock {
                header,
                prefix: String::new(),
                body: self.empty_message.clone(),
            }];
        }

        let breaking = items.iter().filter(|i| i.is_breaking()).map(|item| OutputBlock {
            header: header.clone(),
            prefix: self.breaking_marker.clone(),
            body: item_body(item),
        });
        let numbered = items
            .iter()
            .filter(|i| !i.is_breaking())
            .enumerate()
            .map(|(idx, item)| OutputBlock {
                header: header.clone(),
                prefix: format!("{}. ", idx + 1),
                body: item_body(item),
            });

        breaking.chain(numbered).collect()
    }
}

fn item_body(item: &EnrichedItem) -> String {
    let mut lines = vec![item.rendered_title.trim()];
    let summary = item.rendered_text.trim();
    if !summary.is_empty() {
        lines.push(summary);
    }
    lines.push(item.item.url.as_str());
    lines.join("\n")
}
