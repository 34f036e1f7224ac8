//! Bounded retry with exponential backoff for generation calls.
//!
//! Two failure shapes are transient: a server overload (`503` /
//! `overloaded`) and a per-minute quota hit (`PerMinute`). Overloads back off
//! exponentially from [`RetryPolicy::initial_delay`]; quota hits always wait
//! [`RetryPolicy::rate_limit_delay`]. Everything else fails immediately.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::warn;

use super::GenerateError;
use crate::error::SummaryError;

/// Backoff schedule for one kind of generation call.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt. Attempts are numbered from 0 and a
    /// transient failure is retried while `attempt < max_retries`.
    pub max_retries: u32,
    /// Delay before the first retry of an overload.
    pub initial_delay: Duration,
    /// Backoff multiplier applied per attempt.
    pub multiplier: f64,
    /// Flat wait after a rate-limit failure, regardless of attempt.
    pub rate_limit_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_delay: Duration::from_secs(2),
            multiplier: 2.0,
            rate_limit_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Schedule for the final summary: 32s, 64s, 128s, 256s, 512s.
    pub fn narrative() -> Self {
        Self {
            initial_delay: Duration::from_secs(32),
            ..Default::default()
        }
    }

    /// Schedule for commit summaries: 2s, 4s, 8s, 16s, 32s.
    pub fn commit() -> Self {
        Self::default()
    }

    /// Same shape with every delay zeroed. Useful in tests.
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            initial_delay: Duration::ZERO,
            multiplier: 2.0,
            rate_limit_delay: Duration::ZERO,
        }
    }

    /// Delay before retrying after a failure on `attempt` (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32, rate_limited: bool) -> Duration {
        if rate_limited {
            return self.rate_limit_delay;
        }
        let secs = self.initial_delay.as_secs_f64() * self.multiplier.powi(attempt as i32);
        Duration::from_secs_f64(secs)
    }
}

/// Classify a failed attempt's error text.
///
/// Returns [`SummaryError::Transient`] for overloads and rate limits and
/// [`SummaryError::Generation`] for everything else.
pub fn classify_failure(message: String) -> SummaryError {
    let rate_limited = message.contains("PerMinute");
    let overloaded = message.contains("503") || message.to_lowercase().contains("overloaded");
    if rate_limited || overloaded {
        SummaryError::Transient {
            message,
            rate_limited,
        }
    } else {
        SummaryError::Generation(message)
    }
}

/// Boxed future returned by [`Sleeper::sleep`].
pub type SleepFuture<'a> = Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

/// Source of backoff waits. Injected so retry schedules are testable
/// without real time passing.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration) -> SleepFuture<'_>;
}

/// [`Sleeper`] backed by `tokio::time::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep(&self, duration: Duration) -> SleepFuture<'_> {
        Box::pin(tokio::time::sleep(duration))
    }
}

/// Run `call` until it succeeds, fails permanently, or the policy is spent.
///
/// `call` receives the 0-indexed attempt number. Backoff waits and the calls
/// themselves are abandoned when `cancel` fires.
pub async fn retry_generation<F, Fut>(
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
    cancel: &CancellationToken,
    mut call: F,
) -> Result<String, SummaryError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<String, GenerateError>>,
{
    let mut attempt = 0;
    loop {
        let outcome = tokio::select! {
            _ = cancel.cancelled() => return Err(SummaryError::Cancelled),
            outcome = call(attempt) => outcome,
        };

        let message = match outcome {
            Ok(text) => return Ok(text),
            Err(GenerateError::MissingCredential) => return Err(SummaryError::Credential),
            Err(GenerateError::Failed(message)) => message,
        };

        let (message, rate_limited) = match classify_failure(message) {
            SummaryError::Transient {
                message,
                rate_limited,
            } => (message, rate_limited),
            fatal => return Err(fatal),
        };

        if attempt >= policy.max_retries {
            return Err(SummaryError::ExhaustedRetries {
                attempts: attempt + 1,
                last_error: message,
            });
        }

        let delay = policy.delay_for_attempt(attempt, rate_limited);
        warn!(
            "Transient generation error (attempt {}/{}): {message}. Retrying in {delay:?}...",
            attempt + 1,
            policy.max_retries,
        );
        tokio::select! {
            _ = cancel.cancelled() => return Err(SummaryError::Cancelled),
            _ = sleeper.sleep(delay) => {}
        }
        attempt += 1;
    }
}
