//! Event classification and per-event activity extraction.
//!
//! [`EventKind`] is decoded from the event's `type` string through an
//! explicit mapping. [`ActivityExtractor`] turns one [`RawEvent`] into at most
//! one [`Activity`]; unsupported kinds and malformed records yield `None` and
//! never abort the batch.

use std::fmt;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::cancellable;
use crate::enrich::CommitEnricher;
use crate::error::SummaryError;
use crate::github::GitHubClient;
use crate::github::types::{
    InlineCommit, IssueCommentPayload, PushPayload, RawEvent, ResolvedCommit,
};

/// `before` SHA GitHub reports for a push that created the branch.
const NULL_SHA: &str = "0000000000000000000000000000000000000000";

/// Event types the pipeline understands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    IssueComment,
    Push,
    Unsupported(String),
}

impl EventKind {
    pub fn from_type(kind: &str) -> Self {
        match kind {
            "IssueCommentEvent" => EventKind::IssueComment,
            "PushEvent" => EventKind::Push,
            other => EventKind::Unsupported(other.to_string()),
        }
    }

    /// The GitHub event type string.
    pub fn as_str(&self) -> &str {
        match self {
            EventKind::IssueComment => "IssueCommentEvent",
            EventKind::Push => "PushEvent",
            EventKind::Unsupported(kind) => kind,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One normalized, supported event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activity {
    kind: EventKind,
    repository: String,
    content: String,
}

impl Activity {
    pub fn new(kind: EventKind, repository: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            kind,
            repository: repository.into(),
            content: content.into(),
        }
    }

    pub fn kind(&self) -> &EventKind {
        &self.kind
    }

    pub fn repository(&self) -> &str {
        &self.repository
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

/// Repository full name (`owner/name`) of an event.
pub fn repository_name(event: &RawEvent) -> Option<&str> {
    event.repo.as_ref()?.name.as_deref()
}

/// Content of an issue-comment payload, or `None` if the action isn't
/// `created` or the payload is malformed.
pub fn issue_comment_content(payload: &serde_json::Value) -> Option<String> {
    let payload: IssueCommentPayload = match serde_json::from_value(payload.clone()) {
        Ok(p) => p,
        Err(e) => {
            debug!("Malformed issue comment payload: {e}");
            return None;
        }
    };
    if payload.action != "created" {
        debug!("Unsupported issue comment action: {}", payload.action);
        return None;
    }
    let body = payload.issue.body.unwrap_or_default();
    Some(format!("Issue created: {}\n{body}", payload.issue.title))
}

/// Turns raw events into activities for one run.
pub struct ActivityExtractor<'a> {
    github: &'a GitHubClient,
    enricher: Option<CommitEnricher<'a>>,
}

impl<'a> ActivityExtractor<'a> {
    /// `enricher` is `Some` in strict mode.
    pub fn new(github: &'a GitHubClient, enricher: Option<CommitEnricher<'a>>) -> Self {
        Self { github, enricher }
    }

    pub fn enricher(&self) -> Option<&CommitEnricher<'a>> {
        self.enricher.as_ref()
    }

    /// Extract one event. Only cancellation is an error.
    pub async fn extract(
        &mut self,
        event: &RawEvent,
        cancel: &CancellationToken,
    ) -> Result<Option<Activity>, SummaryError> {
        let Some(id) = event.id.as_deref() else {
            warn!("Skipping event without an id");
            return Ok(None);
        };
        let Some(kind) = event.kind.as_deref().map(EventKind::from_type) else {
            warn!("[{id}] Skipping event without a type");
            return Ok(None);
        };
        if let EventKind::Unsupported(raw) = &kind {
            debug!("[{id}] Unsupported event type: {raw}");
            return Ok(None);
        }
        let Some(repo) = repository_name(event) else {
            warn!("[{id}] Error getting repository name");
            return Ok(None);
        };
        debug!("[{id}] Processing {kind} for repo: {repo}");

        let content = match &kind {
            EventKind::IssueComment => issue_comment_content(&event.payload),
            EventKind::Push => self.push_content(id, repo, &event.payload, cancel).await?,
            EventKind::Unsupported(_) => None,
        };

        Ok(content.map(|content| Activity::new(kind, repo, content)))
    }

    async fn push_content(
        &mut self,
        id: &str,
        repo: &str,
        payload: &serde_json::Value,
        cancel: &CancellationToken,
    ) -> Result<Option<String>, SummaryError> {
        let payload: PushPayload = match serde_json::from_value(payload.clone()) {
            Ok(p) => p,
            Err(e) => {
                warn!("[{id}] Malformed push payload: {e}");
                return Ok(None);
            }
        };

        let commits = self.resolve_commits(id, repo, payload, cancel).await?;
        let mut lines = String::new();
        for commit in &commits {
            let line = match self.enricher.as_mut() {
                Some(enricher) => enricher.commit_line(commit, cancel).await?,
                None => commit.message.clone(),
            };
            lines.push_str(&line);
            lines.push('\n');
        }

        if lines.is_empty() {
            debug!("[{id}] No commit messages found");
            return Ok(None);
        }
        Ok(Some(lines))
    }

    /// The push's commits: from the compare API when the SHA range is
    /// usable, otherwise (or on compare failure) from the inline list.
    async fn resolve_commits(
        &self,
        id: &str,
        repo: &str,
        payload: PushPayload,
        cancel: &CancellationToken,
    ) -> Result<Vec<ResolvedCommit>, SummaryError> {
        let inline = |commits: Vec<InlineCommit>| -> Vec<ResolvedCommit> {
            commits.into_iter().filter_map(InlineCommit::resolve).collect()
        };

        let range = match (payload.before.as_deref(), payload.head.as_deref()) {
            (Some(before), Some(head)) if before != NULL_SHA => Some((before, head)),
            _ => None,
        };
        let Some((before, head)) = range else {
            return Ok(inline(payload.commits));
        };

        match cancellable(cancel, self.github.compare_commits(repo, before, head)).await {
            Ok(commits) => Ok(commits),
            Err(SummaryError::Cancelled) => Err(SummaryError::Cancelled),
            Err(e) => {
                warn!("[{id}] Error fetching commits from compare API: {e}");
                Ok(inline(payload.commits))
            }
        }
    }
}
