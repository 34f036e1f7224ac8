//! Error taxonomy for the summarization pipeline.
//!
//! Only event fetching and the final summarization call surface these to the
//! caller. Per-event, per-repository and per-commit failures are logged and
//! skipped inside the pipeline and never become a `SummaryError`.

use std::time::Duration;

use thiserror::Error;

/// Everything that can end a summary run.
#[derive(Debug, Error)]
pub enum SummaryError {
    /// Transport-level failure (connect, TLS, timeout, body read).
    #[error("request failed: {0}")]
    Network(String),

    /// The GitHub API answered with a non-success status.
    #[error("GitHub API HTTP {status}: {body}")]
    Upstream { status: u16, body: String },

    /// Malformed JSON or a missing required field.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// No summarization credential configured.
    #[error("GEMINI_API_KEY is not set")]
    Credential,

    /// A retryable summarization failure (overload or rate limit).
    #[error("transient generation failure: {message}")]
    Transient { message: String, rate_limited: bool },

    /// Every retry was spent on transient failures.
    #[error("generation failed after {attempts} attempts: {last_error}")]
    ExhaustedRetries { attempts: u32, last_error: String },

    /// The model answered but produced no text.
    #[error("no summary generated")]
    EmptyResult,

    /// A non-retryable summarization failure.
    #[error("generation failed: {0}")]
    Generation(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),

    /// Caller-supplied input failed validation.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SummaryError {
    /// Whether the error was caused by the request rather than by an
    /// upstream service. Used by the HTTP layer for status mapping.
    pub fn is_client_error(&self) -> bool {
        matches!(self, SummaryError::InvalidInput(_))
    }
}

impl From<reqwest::Error> for SummaryError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            SummaryError::Decode(e.to_string())
        } else {
            SummaryError::Network(e.to_string())
        }
    }
}

impl From<serde_json::Error> for SummaryError {
    fn from(e: serde_json::Error) -> Self {
        SummaryError::Decode(e.to_string())
    }
}

/// Shorten an upstream body for inclusion in an error message.
pub(crate) fn truncate_body(body: &str, max_chars: usize) -> String {
    if body.chars().count() <= max_chars {
        return body.to_string();
    }
    let mut out: String = body.chars().take(max_chars).collect();
    out.push_str("...");
    out
}
