//! Summary card server.
//!
//! # Usage
//!
//! ```bash
//! GEMINI_API_KEY=... cargo run -p ghsummary-web
//! GEMINI_API_KEY=... GITHUB_TOKEN=... cargo run -p ghsummary-web -- --port 8080
//! ```
//!
//! Then embed `http://localhost:3001/api?username=octocat` as an image.

use std::sync::Arc;

use clap::Parser;
use ghsummary::{SummaryConfig, SummaryService};
use ghsummary_web::{WebConfig, spawn_web};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Serve GitHub activity summaries as SVG images.
#[derive(Parser)]
#[command(name = "ghsummary-web", version)]
struct Args {
    /// Port to listen on.
    #[arg(long, default_value_t = 3001)]
    port: u16,

    /// Listen on all interfaces instead of loopback only.
    #[arg(long)]
    public: bool,

    /// Per-request deadline, in seconds.
    #[arg(long, default_value_t = 900)]
    timeout_secs: u64,
}

#[tokio::main]
async fn main() -> Result<(), String> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = SummaryConfig::from_env()
        .with_deadline(Some(std::time::Duration::from_secs(args.timeout_secs)));
    if config.gemini_api_key.is_none() {
        tracing::warn!("GEMINI_API_KEY is not set; every summary request will fail");
    }
    let service = Arc::new(SummaryService::new(config).map_err(|e| e.to_string())?);

    let host = if args.public { [0, 0, 0, 0] } else { [127, 0, 0, 1] };
    let shutdown = CancellationToken::new();
    let web_config = WebConfig {
        bind_addr: (host, args.port).into(),
        shutdown: shutdown.clone(),
    };
    let addr = spawn_web(service, web_config)
        .await
        .map_err(|e| format!("failed to bind port {}: {e}", args.port))?;
    println!("Serving summaries on http://{addr}/api?username=<user>");

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| format!("failed to listen for shutdown signal: {e}"))?;
    shutdown.cancel();
    Ok(())
}
