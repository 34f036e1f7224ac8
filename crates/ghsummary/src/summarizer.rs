//! Retry-governed summarization on top of a [`TextGenerator`].
//!
//! A [`Summarizer`] pairs one backend (one model) with one [`RetryPolicy`].
//! The pipeline builds two: a narrative summarizer with the long backoff and
//! a commit summarizer with the short one.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::api::retry::{RetryPolicy, Sleeper, TokioSleeper, retry_generation};
use crate::api::TextGenerator;
use crate::error::SummaryError;
use crate::prompt::{COMMIT_SUMMARY_INSTRUCTION, activity_summary_instruction};

/// A text generator plus its retry schedule.
#[derive(Clone)]
pub struct Summarizer {
    generator: Arc<dyn TextGenerator>,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl Summarizer {
    pub fn new(generator: Arc<dyn TextGenerator>, policy: RetryPolicy) -> Self {
        Self {
            generator,
            policy,
            sleeper: Arc::new(TokioSleeper),
        }
    }

    /// Replace the backoff sleeper.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Summarize `text` under `instruction`.
    ///
    /// Transient failures are retried per the policy; an all-empty response
    /// is [`SummaryError::EmptyResult`] and is not retried.
    pub async fn summarize(
        &self,
        text: &str,
        instruction: &str,
        cancel: &CancellationToken,
    ) -> Result<String, SummaryError> {
        let generator = &self.generator;
        let output = retry_generation(&self.policy, self.sleeper.as_ref(), cancel, |attempt| {
            debug!("Generating summary (attempt {})", attempt + 1);
            generator.generate(instruction, text)
        })
        .await?;

        if output.is_empty() {
            return Err(SummaryError::EmptyResult);
        }
        Ok(output)
    }

    /// Final activity summary for an assembled narrative.
    pub async fn summarize_activity(
        &self,
        narrative: &str,
        pronouns: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<String, SummaryError> {
        let instruction = activity_summary_instruction(pronouns);
        let summary = self.summarize(narrative, &instruction, cancel).await?;
        info!("Summary: {summary}");
        Ok(summary)
    }

    /// Short summary of one commit's message and patches.
    pub async fn summarize_commit(
        &self,
        content: &str,
        cancel: &CancellationToken,
    ) -> Result<String, SummaryError> {
        let summary = self
            .summarize(content, COMMIT_SUMMARY_INSTRUCTION, cancel)
            .await?;
        debug!("Commit summary: {summary}");
        Ok(summary)
    }
}
