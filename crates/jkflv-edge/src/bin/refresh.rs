//! One-shot content refresh for external schedulers.
//!
//! Runs a single refresh cycle against the configured origin and snapshot
//! store, prints the resulting ledger entry as JSON and exits. Without
//! `--force` the run is skipped when the last one is recent.
//!
//! # Usage
//!
//! ```bash
//! # From cron, every hour
//! jkflv-refresh
//!
//! # Ignore the staleness window
//! jkflv-refresh --force
//! ```
//!
//! Exits non-zero when the ledger could not be written, or with
//! `--strict` when any section failed.

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use jkflv_edge::{AppState, Config};

/// Run one JKAnime FLV content refresh.
#[derive(Parser, Debug)]
#[command(name = "jkflv-refresh")]
#[command(about = "Refresh home, genre and popular sections and rebuild the sitemap")]
struct Args {
    /// Path to .env file (optional).
    #[arg(long, env = "DOTENV_PATH", default_value = ".env")]
    dotenv: String,

    /// Refresh even if the last run is within the refresh interval.
    #[arg(long)]
    force: bool,

    /// Exit with an error if any section failed.
    #[arg(long)]
    strict: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if std::path::Path::new(&args.dotenv).exists() {
        dotenvy::from_path(&args.dotenv)?;
    }

    // Logs go to stderr; stdout carries the ledger JSON.
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::from_env()?;
    let state = AppState::new(config)?;

    let outcome = state
        .refresher
        .run(args.force)
        .await
        .context("failed to record refresh ledger")?;

    if outcome.was_skipped() {
        tracing::info!("last refresh is recent, nothing to do");
    }

    let ledger = outcome.into_ledger();
    println!("{}", serde_json::to_string_pretty(&ledger)?);

    if args.strict && !ledger.success {
        anyhow::bail!(
            "refresh incomplete: {}",
            ledger.error_message.as_deref().unwrap_or("unknown failure")
        );
    }

    Ok(())
}
