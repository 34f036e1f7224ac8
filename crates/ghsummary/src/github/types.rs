//! Wire types for the GitHub REST responses the pipeline consumes.
//!
//! Only the fields actually read are modelled. Everything is optional so a
//! record missing a field decodes fine and the extractor decides what a
//! missing field means for that record.

use serde::Deserialize;

/// One record from `GET /users/{username}/events`.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct RawEvent {
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub repo: Option<RepoRef>,
    /// Decoded lazily per event kind.
    #[serde(default)]
    pub payload: serde_json::Value,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct RepoRef {
    pub name: Option<String>,
}

/// Payload of an `IssueCommentEvent`.
#[derive(Deserialize, Debug, Clone)]
pub struct IssueCommentPayload {
    pub action: String,
    pub issue: Issue,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Issue {
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
}

/// Payload of a `PushEvent`.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct PushPayload {
    pub before: Option<String>,
    pub head: Option<String>,
    /// Inline commit list. GitHub may truncate or omit it.
    #[serde(default)]
    pub commits: Vec<InlineCommit>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct InlineCommit {
    pub message: Option<String>,
    pub url: Option<String>,
}

/// Response of `GET /repos/{repo}/compare/{base}...{head}`.
#[derive(Deserialize, Debug, Clone)]
pub struct CompareResponse {
    pub commits: Vec<CompareCommit>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct CompareCommit {
    pub url: Option<String>,
    pub commit: Option<CommitInfo>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct CommitInfo {
    pub message: Option<String>,
}

/// Response of `GET /repos/{repo}/commits/{sha}`.
#[derive(Deserialize, Debug, Clone)]
pub struct CommitDetail {
    pub files: Option<Vec<CommitFile>>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct CommitFile {
    pub filename: Option<String>,
    /// Absent for binary files and very large diffs.
    pub patch: Option<String>,
}

/// Response of `GET /repos/{repo}/contents/README.md`.
#[derive(Deserialize, Debug, Clone)]
pub struct ContentResponse {
    pub content: Option<String>,
}

/// A commit reduced to what the extractor needs, regardless of which
/// endpoint it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCommit {
    pub message: String,
    /// API URL of the full commit resource, used for diff enrichment.
    pub url: Option<String>,
}

impl CompareCommit {
    pub fn resolve(self) -> Option<ResolvedCommit> {
        let message = self.commit?.message?;
        Some(ResolvedCommit {
            message,
            url: self.url,
        })
    }
}

impl InlineCommit {
    pub fn resolve(self) -> Option<ResolvedCommit> {
        Some(ResolvedCommit {
            message: self.message?,
            url: self.url,
        })
    }
}
