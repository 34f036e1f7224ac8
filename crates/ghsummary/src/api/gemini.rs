//! Gemini `generateContent` client.
//!
//! One request per call: a fixed system instruction plus the input text as
//! the sole user turn. No streaming, no conversation state.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::{GenerateError, GenerateFuture, TextGenerator};
use crate::error::{SummaryError, truncate_body};

// ── Request types ──────────────────────────────────────────────────

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
}

#[derive(Serialize, Debug)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize, Debug)]
struct Part<'a> {
    text: &'a str,
}

// ── Response types ─────────────────────────────────────────────────

#[derive(Deserialize, Debug)]
struct RawGenerateResponse {
    candidates: Option<Vec<RawCandidate>>,
    error: Option<ApiErrorResponse>,
}

#[derive(Deserialize, Debug)]
struct RawCandidate {
    content: Option<RawContent>,
}

#[derive(Deserialize, Debug)]
struct RawContent {
    #[serde(default)]
    parts: Vec<RawPart>,
}

#[derive(Deserialize, Debug)]
struct RawPart {
    text: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ApiErrorResponse {
    message: String,
}

impl RawGenerateResponse {
    /// Text fragments of the first candidate, concatenated in order.
    fn into_text(self) -> String {
        self.candidates
            .and_then(|c| c.into_iter().next())
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

// ── Client ─────────────────────────────────────────────────────────

/// Async HTTP client for one Gemini model.
#[derive(Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl GeminiClient {
    /// Create a client for `model`. A missing key is not an error here;
    /// every generation call reports it instead.
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, SummaryError> {
        let client = reqwest::Client::builder()
            .user_agent(crate::USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| SummaryError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            model: model.into(),
        })
    }

    /// The same client targeting a different model.
    pub fn with_model(&self, model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..self.clone()
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    async fn generate_content(&self, system: &str, user: &str) -> Result<String, GenerateError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(GenerateError::MissingCredential);
        };

        let body = GenerateContentRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part { text: system }],
            },
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part { text: user }],
            }],
        };
        debug!(
            "Gemini request: model={}, input={} chars",
            self.model,
            user.len()
        );
        trace!(
            "Request payload size: {} bytes",
            serde_json::to_string(&body).map_or(0, |s| s.len())
        );

        let start = Instant::now();
        let resp = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerateError::Failed(format!("request failed: {e}")))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| GenerateError::Failed(format!("failed to read response: {e}")))?;
        debug!(
            "Gemini response: HTTP {} in {:.1}s ({} bytes)",
            status,
            start.elapsed().as_secs_f64(),
            text.len()
        );

        if !status.is_success() {
            return Err(GenerateError::Failed(format!(
                "Gemini API HTTP {status}: {}",
                truncate_body(&text, 2000)
            )));
        }

        let parsed: RawGenerateResponse = serde_json::from_str(&text)
            .map_err(|e| GenerateError::Failed(format!("failed to parse response: {e}")))?;
        if let Some(err) = parsed.error {
            return Err(GenerateError::Failed(format!(
                "Gemini API error: {}",
                err.message
            )));
        }

        let output = parsed.into_text();
        debug!("Gemini output: {} chars", output.len());
        Ok(output)
    }
}

impl TextGenerator for GeminiClient {
    fn generate<'a>(&'a self, system: &'a str, user: &'a str) -> GenerateFuture<'a> {
        Box::pin(self.generate_content(system, user))
    }
}
