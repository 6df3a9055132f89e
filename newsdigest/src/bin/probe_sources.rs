// Fetch every configured source once and print what it yields, without filtering.
use common::{Config, SourceConfig};
use newsdigest::ingestion::{build_http_client, build_sources, DEFAULT_USER_AGENT};
use std::path::PathBuf;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let default_path = PathBuf::from("config.default.toml");
    let override_path = std::env::args().nth(1).map(PathBuf::from).or_else(|| {
        let p = PathBuf::from("config.toml");
        p.exists().then_some(p)
    });

    let config = Config::load_with_defaults(
        default_path.exists().then_some(default_path.as_path()),
        override_path.as_deref(),
    )
    .await?;

    let politeness = config.politeness.as_ref();
    let client = build_http_client(
        politeness.and_then(|p| p.fetch_timeout_seconds).unwrap_or(10),
        politeness
            .and_then(|p| p.user_agent.as_deref())
            .unwrap_or(DEFAULT_USER_AGENT),
    )?;
    let sources = build_sources(&config.sources, &client);

    for (cfg, source) in config.sources.iter().zip(&sources) {
        let kind = match cfg {
            SourceConfig::Feed { .. } => "feed",
            SourceConfig::Page { .. } => "page",
        };
        println!("\n{}", "=".repeat(60));
        println!("Testing {} '{}': {}", kind, cfg.display_label(), cfg.url());
        println!("{}", "=".repeat(60));

        match source.fetch().await {
            Ok(items) => {
                println!("✓ {} candidates", items.len());
                for (i, item) in items.iter().take(3).enumerate() {
                    println!("    {}. {}", i + 1, item.title);
                    println!("       URL: {}", item.url);
                    println!(
                        "       Published: {}, Summary: {} chars",
                        item.published_at
                            .map(|d| d.to_rfc3339())
                            .unwrap_or_else(|| "unknown".to_string()),
                        item.summary.len()
                    );
                }
            }
            Err(e) => {
                println!("✗ Failed: {:#}", e);
            }
        }
    }

    Ok(())
}
