//! Request handlers.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use ghsummary::{Mode, SummaryError, SummaryRequest, SummaryService};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Shared application state passed to all handlers via axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<SummaryService>,
    pub shutdown: CancellationToken,
}

/// Query string of `GET /` and `GET /api`.
///
/// Everything is taken as text so malformed values map to 400 here instead
/// of axum's generic rejection.
#[derive(Debug, Default, Deserialize)]
pub struct SummaryQuery {
    pub username: Option<String>,
    #[serde(rename = "max-events")]
    pub max_events: Option<String>,
    pub mode: Option<String>,
    pub pronouns: Option<String>,
}

impl SummaryQuery {
    /// Validate the query into a pipeline request.
    pub fn into_request(self) -> Result<SummaryRequest, String> {
        let username = self
            .username
            .filter(|u| !u.is_empty())
            .ok_or_else(|| "Missing 'username' query parameter".to_string())?;

        let mut request = SummaryRequest::new(username);
        if let Some(raw) = self.max_events.filter(|v| !v.is_empty()) {
            let max_events: usize = raw
                .parse()
                .map_err(|_| "Invalid 'max-events' query parameter".to_string())?;
            request = request.with_max_events(max_events);
        }
        if let Some(raw) = self.mode.filter(|v| !v.is_empty()) {
            let mode: Mode = raw.parse()?;
            request = request.with_mode(mode);
        }
        if let Some(pronouns) = self.pronouns.filter(|v| !v.is_empty()) {
            request = request.with_pronouns(pronouns);
        }
        Ok(request)
    }
}

/// GET / and GET /api: summary card for one user.
///
/// Returns 200 with an `image/svg+xml` body, 400 for bad query parameters,
/// 504 when the run deadline passes and 500 for any other failure.
pub async fn get_summary(
    State(app): State<AppState>,
    Query(query): Query<SummaryQuery>,
) -> Response {
    let request = match query.into_request() {
        Ok(r) => r,
        Err(message) => return (StatusCode::BAD_REQUEST, message).into_response(),
    };

    info!("Summary requested for {}", request.username);
    let cancel = app.shutdown.child_token();
    // Dropping the handler (client disconnect) cancels the run.
    let _guard = cancel.clone().drop_guard();

    match app.service.render_svg(&request, &cancel).await {
        Ok(svg) => ([(header::CONTENT_TYPE, "image/svg+xml")], svg).into_response(),
        Err(e) => {
            warn!("Summary for {} failed: {e}", request.username);
            error_response(&e)
        }
    }
}

fn error_response(err: &SummaryError) -> Response {
    let status = match err {
        e if e.is_client_error() => StatusCode::BAD_REQUEST,
        SummaryError::DeadlineExceeded(_) => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let message = if status == StatusCode::BAD_REQUEST {
        err.to_string()
    } else {
        "Failed to generate summary".to_string()
    };
    (status, message).into_response()
}

/// GET /healthz: liveness probe.
pub async fn healthz() -> &'static str {
    "ok"
}
