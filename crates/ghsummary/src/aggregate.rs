//! Aggregation controller: pagination, budgets, dedup, README enrichment.
//!
//! One [`Aggregator::aggregate`] call walks the user's event pages until it
//! has collected `min_activity_count` activities or hit the page ceiling,
//! then fetches one README per distinct repository. Event page failures are
//! fatal and propagate immediately; everything after that is best-effort.
//!
//! ```text
//! Fetching(page) ─▶ Extracting ─┬─▶ Fetching(page + 1)
//!                               └─▶ Enriching ─▶ Rendering ─▶ Done
//! ```

use std::collections::HashSet;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::activity::{Activity, ActivityExtractor};
use crate::cancellable;
use crate::config::Mode;
use crate::enrich::{CommitBudget, CommitEnricher};
use crate::error::SummaryError;
use crate::github::GitHubClient;
use crate::narrative::render_narrative;
use crate::summarizer::Summarizer;
use crate::MAX_EVENTS_CAP;

/// Work ceilings for one aggregation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Budgets {
    /// Events requested per page and the cap on accumulated activities.
    /// Clamped to [`MAX_EVENTS_CAP`]. Default: 100.
    pub max_events: usize,
    /// Keep paginating until this many activities are collected. Default: 10.
    pub min_activity_count: usize,
    /// Commit summary attempts per run (strict mode). Default: 10.
    pub max_commit_summaries: usize,
    /// Page ceiling: pages are fetched while `page < max_pages`, so the
    /// default of 4 fetches at most 3 pages, GitHub's limit for this endpoint.
    pub max_pages: u32,
}

impl Default for Budgets {
    fn default() -> Self {
        Self {
            max_events: MAX_EVENTS_CAP,
            min_activity_count: 10,
            max_commit_summaries: 10,
            max_pages: 4,
        }
    }
}

impl Budgets {
    /// Set the event budget, clamped to `1..=MAX_EVENTS_CAP`.
    pub fn with_max_events(mut self, max_events: usize) -> Self {
        self.max_events = max_events.clamp(1, MAX_EVENTS_CAP);
        self
    }

    fn effective_max_events(&self) -> usize {
        self.max_events.clamp(1, MAX_EVENTS_CAP)
    }
}

/// Insertion-ordered set of repository full names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepositorySet {
    order: Vec<String>,
    seen: HashSet<String>,
}

impl RepositorySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a repository. Returns `false` if it was already present.
    pub fn insert(&mut self, repo: &str) -> bool {
        if self.seen.contains(repo) {
            return false;
        }
        self.seen.insert(repo.to_string());
        self.order.push(repo.to_string());
        true
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Repositories in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }
}

/// README text for one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryDescription {
    pub repository: String,
    pub readme: String,
}

/// Result of one aggregation run, before rendering.
#[derive(Debug, Clone)]
pub struct Aggregation {
    pub username: String,
    pub activities: Vec<Activity>,
    pub repositories: RepositorySet,
    pub descriptions: Vec<RepositoryDescription>,
    pub pages_fetched: u32,
    pub commit_summary_attempts: usize,
}

impl Aggregation {
    /// The plain-text narrative handed to the summarizer.
    pub fn narrative(&self) -> String {
        render_narrative(&self.username, &self.descriptions, &self.activities)
    }
}

/// Drives one user's aggregation.
pub struct Aggregator<'a> {
    github: &'a GitHubClient,
    commit_summarizer: Option<&'a Summarizer>,
    budgets: Budgets,
    mode: Mode,
}

impl<'a> Aggregator<'a> {
    pub fn new(github: &'a GitHubClient, budgets: Budgets, mode: Mode) -> Self {
        Self {
            github,
            commit_summarizer: None,
            budgets,
            mode,
        }
    }

    /// Summarizer for per-commit summaries. Only used in [`Mode::Strict`].
    pub fn with_commit_summarizer(mut self, summarizer: &'a Summarizer) -> Self {
        self.commit_summarizer = Some(summarizer);
        self
    }

    /// Aggregate and render in one step.
    pub async fn collect_narrative(
        &self,
        username: &str,
        cancel: &CancellationToken,
    ) -> Result<String, SummaryError> {
        let aggregation = self.aggregate(username, cancel).await?;
        let narrative = aggregation.narrative();
        debug!("Recent activities:\n{narrative}");
        Ok(narrative)
    }

    pub async fn aggregate(
        &self,
        username: &str,
        cancel: &CancellationToken,
    ) -> Result<Aggregation, SummaryError> {
        let max_events = self.budgets.effective_max_events();
        info!(
            "Fetching activity for user: {username} with max events: {max_events} in mode: {}",
            self.mode
        );

        let enricher = match (self.mode, self.commit_summarizer) {
            (Mode::Strict, Some(summarizer)) => Some(CommitEnricher::new(
                self.github,
                summarizer,
                CommitBudget::new(self.budgets.max_commit_summaries),
            )),
            (Mode::Strict, None) => {
                warn!("Strict mode without a commit summarizer; using raw commit messages");
                None
            }
            (Mode::Fast, _) => None,
        };
        let mut extractor = ActivityExtractor::new(self.github, enricher);

        let mut activities: Vec<Activity> = Vec::new();
        let mut repositories = RepositorySet::new();
        let mut page: u32 = 1;
        let mut pages_fetched = 0;

        while activities.len() < self.budgets.min_activity_count && page < self.budgets.max_pages {
            debug!(
                "Fetching page {page}; {} of {} activities so far",
                activities.len(),
                self.budgets.min_activity_count
            );
            let events = cancellable(
                cancel,
                self.github.fetch_events_page(username, max_events, page),
            )
            .await?;
            pages_fetched += 1;
            debug!("Fetched {} events", events.len());

            if events.is_empty() {
                debug!("Page {page} is empty; no more events upstream");
                break;
            }

            for event in &events {
                if activities.len() >= max_events {
                    debug!("Reached maximum number of activities: {max_events}");
                    break;
                }
                if let Some(activity) = extractor.extract(event, cancel).await? {
                    if repositories.insert(activity.repository()) {
                        debug!("Adding repository: {}", activity.repository());
                    }
                    activities.push(activity);
                }
            }
            page += 1;
        }

        let commit_summary_attempts = match extractor.enricher() {
            Some(enricher) => {
                let budget = enricher.budget();
                debug!(
                    "Commit summaries attempted: {}, budget left: {}",
                    budget.used(),
                    budget.remaining()
                );
                budget.used()
            }
            None => 0,
        };
        let descriptions = self.describe_repositories(&repositories, cancel).await?;

        info!(
            "Collected {} activities across {} repositories in {pages_fetched} page(s)",
            activities.len(),
            repositories.len()
        );
        Ok(Aggregation {
            username: username.to_string(),
            activities,
            repositories,
            descriptions,
            pages_fetched,
            commit_summary_attempts,
        })
    }

    /// One README fetch per repository; failures are skipped.
    async fn describe_repositories(
        &self,
        repositories: &RepositorySet,
        cancel: &CancellationToken,
    ) -> Result<Vec<RepositoryDescription>, SummaryError> {
        let mut descriptions = Vec::new();
        for repo in repositories.iter() {
            match cancellable(cancel, self.github.fetch_readme(repo)).await {
                Ok(Some(readme)) => descriptions.push(RepositoryDescription {
                    repository: repo.to_string(),
                    readme,
                }),
                Ok(None) => debug!("No README.md found for repo {repo}"),
                Err(SummaryError::Cancelled) => return Err(SummaryError::Cancelled),
                Err(e) => warn!("Error fetching README.md for repo {repo}: {e}"),
            }
        }
        Ok(descriptions)
    }
}
