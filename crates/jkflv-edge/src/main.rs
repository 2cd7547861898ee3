//! JKAnime FLV Edge - prerendering, snapshot cache and API proxy server.
//!
//! Serves the built SPA, answers crawler page requests with prerendered
//! snapshots, proxies the content API, and keeps the section aggregates
//! fresh with an in-process refresh loop.

use std::sync::Arc;

use axum::http::Request;
use clap::Parser;
use jkflv_core::metrics::{init_metrics, start_metrics_server};
use tower_http::trace::TraceLayer;
use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use jkflv_edge::refresh::spawn_refresh_loop;
use jkflv_edge::{AppState, Config, router};

/// JKAnime FLV edge server.
#[derive(Parser, Debug)]
#[command(name = "jkflv-edge")]
#[command(about = "Crawler prerendering and content API proxy for JKAnime FLV", long_about = None)]
struct Args {
    /// Path to .env file (optional).
    #[arg(long, env = "DOTENV_PATH", default_value = ".env")]
    dotenv: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Load .env file if it exists
    if std::path::Path::new(&args.dotenv).exists() {
        dotenvy::from_path(&args.dotenv)?;
        eprintln!("Loaded environment from {}", args.dotenv);
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    let bind_addr = config.bind_addr.clone();

    if let Some(port) = config.metrics_port {
        let handle = init_metrics();
        start_metrics_server(port, handle).await?;
    }

    // Create application state
    let state = AppState::new(config)?;

    if let Some(tick) = state.config.refresh_tick {
        spawn_refresh_loop(Arc::clone(&state.refresher), tick);
    } else {
        tracing::info!("periodic refresh disabled");
    }

    // Build router with middleware
    let app = router(state).layer(TraceLayer::new_for_http().make_span_with(
        |request: &Request<_>| {
            tracing::span!(
                Level::INFO,
                "http_request",
                method = %request.method(),
                path = %request.uri().path()
            )
        },
    ));

    // Start server
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "starting server");

    axum::serve(listener, app).await?;

    Ok(())
}
