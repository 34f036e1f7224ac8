//! Read-only GitHub REST client.
//!
//! Every request carries `Accept: application/vnd.github+json` and a user
//! agent; a bearer token is attached when configured. Non-success statuses
//! become [`SummaryError::Upstream`]. Nothing here retries: the caller owns
//! the policy, and the pipeline deliberately never retries GitHub calls.

pub mod types;

use std::time::{Duration, Instant};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as Base64;
use reqwest::Url;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::{SummaryError, truncate_body};
use types::{CommitDetail, CompareResponse, ContentResponse, RawEvent, ResolvedCommit};

/// Async client for the handful of GitHub endpoints the pipeline reads.
#[derive(Clone)]
pub struct GitHubClient {
    client: reqwest::Client,
    api_base: String,
    token: Option<String>,
}

impl GitHubClient {
    pub fn new(
        api_base: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, SummaryError> {
        let client = reqwest::Client::builder()
            .user_agent(crate::USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| SummaryError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token,
        })
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// One page of a user's public events.
    ///
    /// Records that aren't JSON objects are logged and dropped; a body that
    /// isn't a JSON array fails the whole page.
    pub async fn fetch_events_page(
        &self,
        username: &str,
        per_page: usize,
        page: u32,
    ) -> Result<Vec<RawEvent>, SummaryError> {
        debug!("Fetching {per_page} events for {username}, page {page}");
        let url = format!(
            "{}/users/{username}/events?per_page={per_page}&page={page}",
            self.api_base
        );
        let records: Vec<serde_json::Value> = self.get_json(&url).await?;

        let events = records
            .into_iter()
            .filter_map(|record| match serde_json::from_value::<RawEvent>(record) {
                Ok(event) => Some(event),
                Err(e) => {
                    warn!("Skipping malformed event record: {e}");
                    None
                }
            })
            .collect();
        Ok(events)
    }

    /// Commits between two SHAs via the compare API.
    pub async fn compare_commits(
        &self,
        repo: &str,
        before: &str,
        head: &str,
    ) -> Result<Vec<ResolvedCommit>, SummaryError> {
        let url = format!("{}/repos/{repo}/compare/{before}...{head}", self.api_base);
        let compare: CompareResponse = self.get_json(&url).await?;
        Ok(compare
            .commits
            .into_iter()
            .filter_map(|c| {
                let resolved = c.resolve();
                if resolved.is_none() {
                    debug!("Skipping compare entry without a commit message");
                }
                resolved
            })
            .collect())
    }

    /// Full commit resource, including per-file patches.
    ///
    /// Only URLs under the configured API base are fetched so the token is
    /// never sent to another host.
    pub async fn fetch_commit(&self, url: &str) -> Result<CommitDetail, SummaryError> {
        if !self.is_under_api_base(url) {
            return Err(SummaryError::InvalidInput(format!(
                "commit URL outside the GitHub API base: {url}"
            )));
        }
        self.get_json(url).await
    }

    /// Same scheme, host and port as the API base, and a path at or below
    /// the base path.
    fn is_under_api_base(&self, url: &str) -> bool {
        let (Ok(base), Ok(target)) = (Url::parse(&self.api_base), Url::parse(url)) else {
            return false;
        };
        if base.scheme() != target.scheme()
            || base.host_str() != target.host_str()
            || base.port_or_known_default() != target.port_or_known_default()
        {
            return false;
        }
        let base_path = base.path().trim_end_matches('/');
        let path = target.path();
        path == base_path || path.starts_with(&format!("{base_path}/"))
    }

    /// Decoded `README.md` of a repository, or `None` when it has none.
    pub async fn fetch_readme(&self, repo: &str) -> Result<Option<String>, SummaryError> {
        let url = format!("{}/repos/{repo}/contents/README.md", self.api_base);
        let content: ContentResponse = match self.get_json(&url).await {
            Ok(content) => content,
            Err(SummaryError::Upstream { status: 404, .. }) => return Ok(None),
            Err(e) => return Err(e),
        };
        let encoded = content
            .content
            .ok_or_else(|| SummaryError::Decode(format!("README of {repo} has no content")))?;
        decode_base64_content(&encoded).map(Some)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, SummaryError> {
        let mut request = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let start = Instant::now();
        let resp = request.send().await?;
        let status = resp.status();
        let text = resp.text().await?;
        debug!(
            "GitHub response: HTTP {} for {url} in {:.1}s ({} bytes)",
            status,
            start.elapsed().as_secs_f64(),
            text.len()
        );

        if !status.is_success() {
            return Err(SummaryError::Upstream {
                status: status.as_u16(),
                body: truncate_body(&text, 500),
            });
        }
        Ok(serde_json::from_str(&text)?)
    }
}

/// Decode a GitHub contents payload. GitHub wraps the base64 at 60 columns.
pub fn decode_base64_content(encoded: &str) -> Result<String, SummaryError> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = Base64
        .decode(compact.as_bytes())
        .map_err(|e| SummaryError::Decode(format!("invalid base64 content: {e}")))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
