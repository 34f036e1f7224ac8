//! Per-commit diff summaries for push events in strict mode.
//!
//! Each attempt fetches the commit resource, folds its message and patches
//! into one prompt, and asks the commit [`Summarizer`] for a short summary.
//! Any failure yields `None` and the caller keeps the raw commit message.

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::cancellable;
use crate::error::SummaryError;
use crate::github::GitHubClient;
use crate::github::types::{CommitDetail, ResolvedCommit};
use crate::summarizer::Summarizer;

/// Ceiling on commit summary attempts for one run.
///
/// Consumed when an attempt starts, not when it succeeds, so a run never
/// makes more than `limit` enrichment round trips.
#[derive(Debug, Clone)]
pub struct CommitBudget {
    limit: usize,
    used: usize,
}

impl CommitBudget {
    pub fn new(limit: usize) -> Self {
        Self { limit, used: 0 }
    }

    /// Take one attempt from the budget. Returns `false` once spent.
    pub fn try_consume(&mut self) -> bool {
        if self.used >= self.limit {
            return false;
        }
        self.used += 1;
        true
    }

    pub fn used(&self) -> usize {
        self.used
    }

    pub fn remaining(&self) -> usize {
        self.limit - self.used
    }
}

/// Commit summarization state for one aggregation run.
pub struct CommitEnricher<'a> {
    github: &'a GitHubClient,
    summarizer: &'a Summarizer,
    budget: CommitBudget,
}

impl<'a> CommitEnricher<'a> {
    pub fn new(github: &'a GitHubClient, summarizer: &'a Summarizer, budget: CommitBudget) -> Self {
        Self {
            github,
            summarizer,
            budget,
        }
    }

    pub fn budget(&self) -> &CommitBudget {
        &self.budget
    }

    /// The text line for one commit: `"Commit summary: …"` when enrichment
    /// succeeds, the raw message otherwise. Only cancellation is an error.
    pub async fn commit_line(
        &mut self,
        commit: &ResolvedCommit,
        cancel: &CancellationToken,
    ) -> Result<String, SummaryError> {
        let Some(url) = commit.url.as_deref() else {
            return Ok(commit.message.clone());
        };
        if !self.budget.try_consume() {
            return Ok(commit.message.clone());
        }
        match self.summarize_commit(&commit.message, url, cancel).await {
            Ok(Some(summary)) => Ok(format!("Commit summary: {summary}")),
            Ok(None) => Ok(commit.message.clone()),
            Err(e) => Err(e),
        }
    }

    /// Summarize one commit. `Ok(None)` on any failure other than
    /// cancellation.
    pub async fn summarize_commit(
        &self,
        message: &str,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<String>, SummaryError> {
        let detail = match cancellable(cancel, self.github.fetch_commit(url)).await {
            Ok(detail) => detail,
            Err(SummaryError::Cancelled) => return Err(SummaryError::Cancelled),
            Err(e) => {
                warn!("Failed to fetch commit {url}: {e}");
                return Ok(None);
            }
        };

        let Some(prompt) = commit_prompt(message, &detail, url) else {
            warn!("Commit {url} has no file list");
            return Ok(None);
        };

        match self.summarizer.summarize_commit(&prompt, cancel).await {
            Ok(summary) => Ok(Some(summary)),
            Err(SummaryError::Cancelled) => Err(SummaryError::Cancelled),
            Err(e) => {
                warn!("Failed to summarize commit {url}: {e}");
                Ok(None)
            }
        }
    }
}

/// Prompt text for one commit: its message, then each file's name and
/// patch. Files without a patch are skipped; a missing file list is `None`.
pub fn commit_prompt(message: &str, detail: &CommitDetail, url: &str) -> Option<String> {
    let files = detail.files.as_ref()?;
    let mut prompt = format!("Commit message: {message}\n");
    for file in files {
        let Some(filename) = file.filename.as_deref() else {
            debug!("Skipping file without a name in {url}");
            continue;
        };
        let Some(patch) = file.patch.as_deref() else {
            debug!("No patch for {filename} in {url}");
            continue;
        };
        prompt.push_str(&format!("File: {filename}\nPatch:\n{patch}\n"));
    }
    Some(prompt)
}
