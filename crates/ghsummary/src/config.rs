//! Run configuration with sensible defaults.
//!
//! [`SummaryConfig`] is the only place credentials and endpoints live.
//! [`SummaryConfig::from_env`] is the single environment lookup; everything
//! downstream receives the config explicitly, so tests can point the clients
//! at local fake servers.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::aggregate::Budgets;
use crate::api::retry::RetryPolicy;
use crate::svg::SvgLayout;
use crate::{DEFAULT_COMMIT_MODEL, DEFAULT_SUMMARY_MODEL, GEMINI_API_URL, GITHUB_API_URL};

/// How push-event commits are turned into text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Raw commit messages only.
    #[default]
    Fast,
    /// Each commit diff is summarized by the model (within budget).
    Strict,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Fast => "fast",
            Mode::Strict => "strict",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fast" => Ok(Mode::Fast),
            "strict" | "enhanced" => Ok(Mode::Strict),
            other => Err(format!("unknown mode '{other}', expected 'fast' or 'strict'")),
        }
    }
}

/// Configuration for a summary service.
#[derive(Debug, Clone)]
pub struct SummaryConfig {
    /// GitHub REST base URL. Default: `https://api.github.com`.
    pub github_api_url: String,
    /// Bearer token for GitHub. Unauthenticated when `None`.
    pub github_token: Option<String>,
    /// Gemini base URL. Default: `https://generativelanguage.googleapis.com`.
    pub gemini_api_url: String,
    /// Gemini API key. Summarization fails with a credential error when `None`.
    pub gemini_api_key: Option<String>,
    /// Model for the final summary. Default: `gemini-2.5-flash`.
    pub summary_model: String,
    /// Model for per-commit summaries. Default: `gemini-2.5-flash-lite`.
    pub commit_model: String,
    /// Default mode for requests that don't choose one.
    pub mode: Mode,
    /// Budgets for one aggregation run.
    pub budgets: Budgets,
    /// Retry schedule for the final summary call.
    pub summary_retry: RetryPolicy,
    /// Retry schedule for per-commit summary calls.
    pub commit_retry: RetryPolicy,
    /// Per-HTTP-request timeout. Default: 60s.
    pub http_timeout: Duration,
    /// Overall deadline for one summary run. `None` disables it.
    pub deadline: Option<Duration>,
    /// SVG output geometry.
    pub layout: SvgLayout,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            github_api_url: GITHUB_API_URL.to_string(),
            github_token: None,
            gemini_api_url: GEMINI_API_URL.to_string(),
            gemini_api_key: None,
            summary_model: DEFAULT_SUMMARY_MODEL.to_string(),
            commit_model: DEFAULT_COMMIT_MODEL.to_string(),
            mode: Mode::Fast,
            budgets: Budgets::default(),
            summary_retry: RetryPolicy::narrative(),
            commit_retry: RetryPolicy::commit(),
            http_timeout: Duration::from_secs(60),
            deadline: Some(Duration::from_secs(15 * 60)),
            layout: SvgLayout::default(),
        }
    }
}

impl SummaryConfig {
    /// Defaults plus credentials and endpoint overrides from the environment.
    ///
    /// Reads `GITHUB_TOKEN`, `GEMINI_API_KEY`, `GITHUB_API_URL` and
    /// `GEMINI_API_URL`. Empty values count as unset.
    pub fn from_env() -> Self {
        let mut config = Self {
            github_token: non_empty_env("GITHUB_TOKEN"),
            gemini_api_key: non_empty_env("GEMINI_API_KEY"),
            ..Default::default()
        };
        if let Some(url) = non_empty_env("GITHUB_API_URL") {
            config.github_api_url = url;
        }
        if let Some(url) = non_empty_env("GEMINI_API_URL") {
            config.gemini_api_url = url;
        }
        config
    }

    pub fn with_github_token(mut self, token: impl Into<String>) -> Self {
        self.github_token = Some(token.into());
        self
    }

    pub fn with_gemini_api_key(mut self, key: impl Into<String>) -> Self {
        self.gemini_api_key = Some(key.into());
        self
    }

    /// Point both clients at different base URLs (tests, proxies).
    pub fn with_endpoints(mut self, github: impl Into<String>, gemini: impl Into<String>) -> Self {
        self.github_api_url = github.into();
        self.gemini_api_url = gemini.into();
        self
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_budgets(mut self, budgets: Budgets) -> Self {
        self.budgets = budgets;
        self
    }

    pub fn with_retry(mut self, summary: RetryPolicy, commit: RetryPolicy) -> Self {
        self.summary_retry = summary;
        self.commit_retry = commit;
        self
    }

    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
