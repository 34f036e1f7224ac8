//! Summarize a GitHub user's recent public activity into a small SVG card.
//!
//! `ghsummary` pulls the user's event stream from the GitHub REST API,
//! condenses the supported events (issue comments, pushes) into a plain-text
//! narrative, asks Gemini to turn that narrative into a few sentences, and
//! wraps the result into a fixed-width SVG image.
//!
//! # Getting started
//!
//! ```ignore
//! use ghsummary::{SummaryConfig, SummaryRequest, SummaryService};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), ghsummary::SummaryError> {
//!     let config = SummaryConfig::from_env();
//!     let service = SummaryService::new(config)?;
//!
//!     let request = SummaryRequest::new("octocat");
//!     let svg = service.render_svg(&request, &CancellationToken::new()).await?;
//!     println!("{svg}");
//!     Ok(())
//! }
//! ```
//!
//! # Pipeline
//!
//! ```text
//! GitHubClient ──events──▶ ActivityExtractor ──Activity──▶ Aggregator ──narrative──▶ Summarizer ──text──▶ svg
//!                              │                               │
//!                              └── CommitEnricher (strict) ────┘── README per repository
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`github`] | Authenticated read-only GitHub REST client and wire types |
//! | [`activity`] | [`EventKind`] decoding and per-event [`Activity`] extraction |
//! | [`enrich`] | Per-commit diff summaries under a [`CommitBudget`](enrich::CommitBudget) |
//! | [`aggregate`] | Pagination, budgets, repository dedup, README enrichment |
//! | [`narrative`] | Plain-text narrative assembly |
//! | [`api`] | Gemini client, retry policy, failure classification |
//! | [`summarizer`] | Retry-governed summarization on top of a [`TextGenerator`](api::TextGenerator) |
//! | [`svg`] | Deterministic word wrap and SVG rendering |
//! | [`pipeline`] | [`SummaryService`] tying everything together |

pub mod activity;
pub mod aggregate;
pub mod api;
pub mod config;
pub mod enrich;
pub mod error;
pub mod github;
pub mod narrative;
pub mod pipeline;
pub mod prompt;
pub mod sanitize;
pub mod summarizer;
pub mod svg;

pub use activity::{Activity, EventKind};
pub use aggregate::{Aggregation, Aggregator, Budgets, RepositorySet};
pub use config::{Mode, SummaryConfig};
pub use error::SummaryError;
pub use pipeline::{SummaryRequest, SummaryService, generate_summary, generate_summary_svg};
pub use summarizer::Summarizer;
pub use svg::{SvgLayout, render_svg, wrap_text, write_svg_file};

use std::future::Future;

use tokio_util::sync::CancellationToken;

// ── Constants ──────────────────────────────────────────────────────

pub const GITHUB_API_URL: &str = "https://api.github.com";

pub const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com";

/// Model for the final activity summary.
pub const DEFAULT_SUMMARY_MODEL: &str = "gemini-2.5-flash";

/// Cheaper model for per-commit summaries.
pub const DEFAULT_COMMIT_MODEL: &str = "gemini-2.5-flash-lite";

/// Hard cap on events per page and activities per run. GitHub's events
/// endpoint never returns more than 100 records per page.
pub const MAX_EVENTS_CAP: usize = 100;

/// User agent sent with every outbound request.
pub const USER_AGENT: &str = concat!("ghsummary/", env!("CARGO_PKG_VERSION"));

// ── Cancellation ───────────────────────────────────────────────────

/// Race a fallible future against a cancellation token.
pub(crate) async fn cancellable<T, F>(cancel: &CancellationToken, fut: F) -> Result<T, SummaryError>
where
    F: Future<Output = Result<T, SummaryError>>,
{
    if cancel.is_cancelled() {
        return Err(SummaryError::Cancelled);
    }
    tokio::select! {
        _ = cancel.cancelled() => Err(SummaryError::Cancelled),
        result = fut => result,
    }
}
