use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::format::OutputBlock;

/// Build the artifact text: marker line, blocks separated by blank lines,
/// trailing generation timestamp.
pub fn render_artifact(
    marker: &str,
    blocks: &[OutputBlock],
    generated_label: &str,
    generated_at: DateTime<Utc>,
) -> String {
    let mut out = format!("# {}\n\n", marker);
    for block in blocks {
        out.push_str(&block.render());
        out.push_str("\n\n");
    }
    out.push_str(&format!(
        "{}: {}\n",
        generated_label,
        generated_at.to_rfc3339_opts(SecondsFormat::Secs, true)
    ));
    out
}

/// Durable destination of the artifact. Errors here are fatal to the run.
#[async_trait]
pub trait ArtifactSink: Send + Sync {
    /// Replace any previous artifact with `contents`.
    async fn write(&self, contents: &str) -> Result<()>;

    /// Where the artifact lands, for reporting.
    fn location(&self) -> String;
}

/// Overwrites a single file, whole, on every run.
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ArtifactSink for FileSink {
    async fn write(&self, contents: &str) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.with_context(|| {
                format!("Failed to create artifact directory: {}", parent.display())
            })?;
        }

        tokio::fs::write(&self.path, contents.as_bytes())
            .await
            .with_context(|| format!("Failed to write artifact: {}", self.path.display()))?;

        info!("Artifact written to {} ({} bytes)", self.path.display(), contents.len());
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

/// Read an artifact back exactly as written.
pub async fn read_artifact(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read artifact: {}", path.display()))
}
