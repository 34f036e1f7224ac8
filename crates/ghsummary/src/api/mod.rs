//! Text-generation layer: the backend seam, the Gemini client, and retry.
//!
//! - [`TextGenerator`]: one request/response generation call. The pipeline
//!   only ever talks to this trait, so tests swap in scripted fakes.
//! - [`gemini`]: [`GeminiClient`], the `generateContent` implementation.
//! - [`retry`]: failure classification (overload vs. rate limit vs. fatal),
//!   [`RetryPolicy`] backoff schedule, and the injectable [`Sleeper`].

pub mod gemini;
pub mod retry;

pub use gemini::GeminiClient;
pub use retry::{RetryPolicy, Sleeper, TokioSleeper, classify_failure};

use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by [`TextGenerator::generate`].
pub type GenerateFuture<'a> = Pin<Box<dyn Future<Output = Result<String, GenerateError>> + Send + 'a>>;

/// Why a single generation attempt failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerateError {
    /// No credential configured. Never retried.
    MissingCredential,
    /// Any other failure, described by its error text. The retry layer
    /// decides from this text whether the failure is transient.
    Failed(String),
}

/// A single-shot text generation backend.
///
/// Uses a boxed future so the trait stays dyn-compatible.
pub trait TextGenerator: Send + Sync {
    /// Generate text for `user` under the given system instruction. Returns
    /// the concatenated text fragments of the response, possibly empty.
    fn generate<'a>(&'a self, system: &'a str, user: &'a str) -> GenerateFuture<'a>;
}
