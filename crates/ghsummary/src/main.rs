//! Command-line entry point: summarize a user's activity into an SVG file.
//!
//! Reads `GEMINI_API_KEY` (required) and `GITHUB_TOKEN` (optional) from the
//! environment. Log verbosity follows `RUST_LOG` (default `info`).
//!
//! # Examples
//!
//! ```sh
//! ghsummary --username octocat --output summary.svg
//! ghsummary --username octocat --mode strict --pronouns they/them
//! ```

use std::time::Duration;

use clap::Parser;
use ghsummary::sanitize::validate_inputs;
use ghsummary::{Mode, SummaryConfig, SummaryRequest, SummaryService, write_svg_file};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Summarize a GitHub user's recent activity into an SVG card.
#[derive(Parser)]
#[command(name = "ghsummary", version)]
struct Cli {
    /// GitHub username to summarize.
    #[arg(long)]
    username: String,

    /// Output SVG path (relative).
    #[arg(long, default_value = "summary.svg")]
    output: String,

    /// Events per page and cap on collected activities (max 100).
    #[arg(long, default_value_t = 100)]
    max_events: usize,

    /// `fast` uses raw commit messages; `strict` summarizes each commit diff.
    #[arg(long, default_value = "fast")]
    mode: Mode,

    /// Pronouns used in the generated summary.
    #[arg(long)]
    pronouns: Option<String>,

    /// Overall deadline for the run, in seconds.
    #[arg(long)]
    timeout_secs: Option<u64>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = validate_inputs(&cli.username, &cli.output) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }

    let mut config = SummaryConfig::from_env().with_mode(cli.mode);
    if let Some(secs) = cli.timeout_secs {
        config = config.with_deadline(Some(Duration::from_secs(secs)));
    }
    let layout = config.layout.clone();

    let service = match SummaryService::new(config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: failed to create clients: {e}");
            std::process::exit(1);
        }
    };

    let mut request = SummaryRequest::new(&cli.username).with_max_events(cli.max_events);
    if let Some(pronouns) = cli.pronouns {
        request = request.with_pronouns(pronouns);
    }

    // Ctrl-C cancels in-flight requests and backoff sleeps.
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_signal.cancel();
        }
    });

    let summary = match service.summarize(&request, &cancel).await {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: failed to generate summary: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = write_svg_file(&summary, &cli.output, &layout) {
        eprintln!("Error: failed to write {}: {e}", cli.output);
        std::process::exit(1);
    }
    info!("Wrote {} bytes of summary to {}", summary.len(), cli.output);
    println!("Summary SVG generated: {}", cli.output);
}
