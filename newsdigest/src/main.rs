/*
newsdigest - single-run main.rs
This binary loads the configuration, runs the digest pipeline once and exits.
Schedule it externally (cron, systemd timer, CI job).
*/

use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use common::{env_lookup, Config};
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use newsdigest::Pipeline;

#[derive(Parser, Debug)]
#[command(name = "newsdigest", about = "Fetch, filter, translate and publish a news digest")]
struct Args {
    /// Path to config.toml
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override log level (info, debug, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit only items tagged as breaking
    #[arg(long)]
    breaking_only: bool,

    /// Write the artifact here instead of output.path
    #[arg(long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Persist the artifact but do not send any message
    #[arg(long)]
    no_distribute: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let default_path = PathBuf::from("config.default.toml");

    let override_path = if let Some(p) = args.config {
        if !p.exists() {
            error!(path = ?p, "specified config file not found");
            return Err(anyhow::anyhow!("Config file not found: {}", p.display()));
        }
        Some(p)
    } else {
        let p = PathBuf::from("config.toml");
        if p.exists() { Some(p) } else { None }
    };

    let mut config = match Config::load_with_defaults(
        if default_path.exists() { Some(&default_path) } else { None },
        override_path.as_deref(),
    )
    .await
    {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("failed to load configuration: {:#}", e);
            return Err(e);
        }
    };
    info!(default = ?default_path, override = ?override_path, "configuration loaded");

    // Environment first, then command line
    config.apply_env_overrides(env_lookup)?;
    if args.breaking_only {
        config.pipeline.breaking_only = true;
    }
    if let Some(path) = args.output {
        config.output.path = path.to_string_lossy().into_owned();
    }
    if args.no_distribute {
        warn!("--no-distribute given; messages will not be sent");
        config.distribution.enabled = false;
    }

    if let Err(e) = config.validate() {
        error!("invalid configuration: {:#}", e);
        return Err(e);
    }

    let pipeline = Pipeline::from_config(&config, env_lookup)?;

    match pipeline.run(Utc::now()).await {
        Ok(report) => {
            info!(
                sources_ok = report.sources_ok,
                sources_failed = report.sources_failed,
                kept = report.kept,
                breaking = report.breaking,
                fallbacks = report.enrichment_fallbacks,
                sent = report.distribution.sent,
                send_failures = report.distribution.failed,
                artifact = %report.artifact,
                "digest run finished"
            );
            Ok(())
        }
        Err(e) => {
            error!("digest run failed: {:#}", e);
            Err(e)
        }
    }
}
