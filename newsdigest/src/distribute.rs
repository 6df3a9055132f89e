use anyhow::{Context, Result};
use async_trait::async_trait;
use common::TelegramCredentials;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info, warn};

use crate::format::OutputBlock;

/// Downstream messaging endpoint.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one message. No retries.
    async fn send(&self, text: &str) -> Result<()>;
}

/// Telegram Bot API `sendMessage` notifier.
pub struct TelegramNotifier {
    api_base: String,
    token: String,
    chat_id: String,
    client: Client,
}

impl TelegramNotifier {
    pub fn new(
        api_base: impl Into<String>,
        credentials: TelegramCredentials,
        timeout_secs: u64,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build reqwest client")?;

        Ok(Self {
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token: credentials.token,
            chat_id: credentials.chat_id,
            client,
        })
    }
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
}

#[derive(Deserialize)]
struct TelegramResponse {
    ok: bool,
    description: Option<String>,
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, text: &str) -> Result<()> {
        let url = format!("{}/bot{}/sendMessage", self.api_base, self.token);

        // without_url keeps the bot token out of error messages
        let response = self
            .client
            .post(&url)
            .json(&SendMessage {
                chat_id: &self.chat_id,
                text,
            })
            .send()
            .await
            .map_err(|e| anyhow::Error::new(e.without_url()))
            .context("Telegram request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Telegram API returned {}: {}", status, body);
        }

        let body: TelegramResponse = response
            .json()
            .await
            .map_err(|e| anyhow::Error::new(e.without_url()))
            .context("Failed to parse Telegram response")?;
        if !body.ok {
            anyhow::bail!(
                "Telegram rejected message: {}",
                body.description.unwrap_or_else(|| "no description".to_string())
            );
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DistributionReport {
    pub sent: usize,
    pub failed: usize,
}

/// Send every block, in order, one message each. A failed send is logged and
/// counted; it never stops the remaining sends.
pub async fn distribute(notifier: &dyn Notifier, blocks: &[OutputBlock]) -> DistributionReport {
    let mut report = DistributionReport::default();

    for (idx, block) in blocks.iter().enumerate() {
        match notifier.send(&block.render()).await {
            Ok(()) => {
                report.sent += 1;
                info!("Block {}/{} sent", idx + 1, blocks.len());
            }
            Err(e) => {
                report.failed += 1;
                error!("Failed to send block {}/{}: {:#}", idx + 1, blocks.len(), e);
            }
        }
    }

    if report.failed > 0 {
        warn!("{} of {} blocks were not delivered", report.failed, blocks.len());
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records messages, failing those that contain "reject".
    #[derive(Default)]
    struct RecordingNotifier {
        attempts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send(&self, text: &str) -> Result<()> {
            self.attempts.lock().unwrap().push(text.to_string());
            if text.contains("reject") {
                anyhow::bail!("Telegram API returned 400 Bad Request");
            }
            Ok(())
        }
    }

    fn block(body: &str) -> OutputBlock {
        OutputBlock {
            header: "H".into(),
            prefix: String::new(),
            body: body.into(),
        }
    }

    #[tokio::test]
    async fn failure_does_not_block_later_sends() {
        let notifier = RecordingNotifier::default();
        let blocks = vec![block("one"), block("reject me"), block("three")];

        let report = distribute(&notifier, &blocks).await;

        assert_eq!(report, DistributionReport { sent: 2, failed: 1 });
        let attempts = notifier.attempts.lock().unwrap();
        assert_eq!(attempts.len(), 3);
        assert_eq!(attempts[2], "H\n\nthree");
    }
}
