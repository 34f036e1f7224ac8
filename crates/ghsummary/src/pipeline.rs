//! End-to-end service: aggregate → summarize → render.
//!
//! A [`SummaryService`] owns the shared, immutable clients and is cheap to
//! put behind an `Arc`. Each call builds a fresh [`Aggregator`], so there is
//! no mutable state across requests.

use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::aggregate::Aggregator;
use crate::api::{GeminiClient, Sleeper};
use crate::config::{Mode, SummaryConfig};
use crate::error::SummaryError;
use crate::github::GitHubClient;
use crate::sanitize::validate_username;
use crate::summarizer::Summarizer;
use crate::svg::render_svg;

/// Per-call parameters. Unset fields fall back to the service config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryRequest {
    pub username: String,
    pub max_events: Option<usize>,
    pub mode: Option<Mode>,
    pub pronouns: Option<String>,
}

impl SummaryRequest {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            max_events: None,
            mode: None,
            pronouns: None,
        }
    }

    pub fn with_max_events(mut self, max_events: usize) -> Self {
        self.max_events = Some(max_events);
        self
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn with_pronouns(mut self, pronouns: impl Into<String>) -> Self {
        self.pronouns = Some(pronouns.into());
        self
    }
}

/// Clients and summarizers for repeated summary runs.
pub struct SummaryService {
    config: SummaryConfig,
    github: GitHubClient,
    narrative: Summarizer,
    commit: Summarizer,
}

impl SummaryService {
    pub fn new(config: SummaryConfig) -> Result<Self, SummaryError> {
        let github = GitHubClient::new(
            config.github_api_url.clone(),
            config.github_token.clone(),
            config.http_timeout,
        )?;
        let gemini = GeminiClient::new(
            config.gemini_api_url.clone(),
            config.gemini_api_key.clone(),
            config.summary_model.clone(),
            config.http_timeout,
        )?;
        let commit_gemini = gemini.with_model(config.commit_model.clone());
        if github.is_authenticated() {
            info!("GitHub requests are authenticated");
        } else {
            warn!("GITHUB_TOKEN is not set; GitHub requests are anonymous and rate limited");
        }

        let narrative = Summarizer::new(Arc::new(gemini), config.summary_retry.clone());
        let commit = Summarizer::new(Arc::new(commit_gemini), config.commit_retry.clone());

        Ok(Self {
            config,
            github,
            narrative,
            commit,
        })
    }

    /// Replace the backoff sleeper of both summarizers.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.narrative = self.narrative.with_sleeper(sleeper.clone());
        self.commit = self.commit.with_sleeper(sleeper);
        self
    }

    pub fn config(&self) -> &SummaryConfig {
        &self.config
    }

    /// The plain-text activity summary for one user.
    pub async fn summarize(
        &self,
        request: &SummaryRequest,
        cancel: &CancellationToken,
    ) -> Result<String, SummaryError> {
        validate_username(&request.username)?;
        self.with_deadline(self.run(request, cancel)).await
    }

    /// The summary rendered as an SVG document.
    pub async fn render_svg(
        &self,
        request: &SummaryRequest,
        cancel: &CancellationToken,
    ) -> Result<String, SummaryError> {
        let summary = self.summarize(request, cancel).await?;
        Ok(render_svg(&summary, &self.config.layout))
    }

    async fn run(
        &self,
        request: &SummaryRequest,
        cancel: &CancellationToken,
    ) -> Result<String, SummaryError> {
        let mut budgets = self.config.budgets.clone();
        if let Some(max_events) = request.max_events {
            budgets = budgets.with_max_events(max_events);
        }
        let mode = request.mode.unwrap_or(self.config.mode);

        let aggregator =
            Aggregator::new(&self.github, budgets, mode).with_commit_summarizer(&self.commit);
        let narrative = aggregator
            .collect_narrative(&request.username, cancel)
            .await?;

        info!("Generating summary for {}", request.username);
        self.narrative
            .summarize_activity(&narrative, request.pronouns.as_deref(), cancel)
            .await
    }

    async fn with_deadline<T>(
        &self,
        fut: impl Future<Output = Result<T, SummaryError>>,
    ) -> Result<T, SummaryError> {
        match self.config.deadline {
            Some(deadline) => tokio::time::timeout(deadline, fut)
                .await
                .map_err(|_| SummaryError::DeadlineExceeded(deadline))?,
            None => fut.await,
        }
    }
}

/// One-shot summary text.
pub async fn generate_summary(
    config: SummaryConfig,
    request: &SummaryRequest,
    cancel: &CancellationToken,
) -> Result<String, SummaryError> {
    SummaryService::new(config)?
        .summarize(request, cancel)
        .await
}

/// One-shot SVG.
pub async fn generate_summary_svg(
    config: SummaryConfig,
    request: &SummaryRequest,
    cancel: &CancellationToken,
) -> Result<String, SummaryError> {
    SummaryService::new(config)?
        .render_svg(request, cancel)
        .await
}
