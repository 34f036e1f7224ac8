//! Integration tests for the aggregation pipeline.
//!
//! These tests start a fake GitHub + Gemini upstream on a random port and
//! drive the real clients against it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use axum::Json;
use axum::Router;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use ghsummary::api::{GeminiClient, RetryPolicy};
use ghsummary::github::GitHubClient;
use ghsummary::{
    Aggregator, Budgets, Mode, Summarizer, SummaryConfig, SummaryError, SummaryRequest,
    SummaryService,
};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

/// "# Demo\n"
const README_B64: &str = "IyBEZW1vCg==";

#[derive(Default)]
struct Upstream {
    base: OnceLock<String>,
    /// Events served per page, 1-indexed; missing pages are empty.
    pages: Vec<Vec<Value>>,
    events_status: Option<StatusCode>,
    /// Status returned by every single-commit request instead of its files.
    commit_status: Option<StatusCode>,
    /// Status returned by the commit model instead of a summary.
    commit_model_status: Option<StatusCode>,
    /// Remaining Gemini calls that answer 503 before succeeding.
    gemini_overloads: AtomicUsize,
    event_calls: AtomicUsize,
    readme_calls: AtomicUsize,
    compare_calls: AtomicUsize,
    commit_calls: AtomicUsize,
    summary_calls: AtomicUsize,
    commit_summary_calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl Upstream {
    fn with_pages(pages: Vec<Vec<Value>>) -> Self {
        Self {
            pages,
            ..Default::default()
        }
    }

    fn base(&self) -> String {
        self.base.get().cloned().unwrap_or_default()
    }
}

async fn events(
    State(up): State<Arc<Upstream>>,
    Path(_user): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    up.event_calls.fetch_add(1, Ordering::SeqCst);
    if let Some(status) = up.events_status {
        return (status, "upstream exploded").into_response();
    }
    let page: usize = query.get("page").and_then(|p| p.parse().ok()).unwrap_or(1);
    let events = up.pages.get(page - 1).cloned().unwrap_or_default();
    Json(Value::Array(events)).into_response()
}

async fn compare(
    State(up): State<Arc<Upstream>>,
    Path((owner, repo, range)): Path<(String, String, String)>,
) -> Json<Value> {
    up.compare_calls.fetch_add(1, Ordering::SeqCst);
    let base = up.base();
    let head = range.rsplit("...").next().unwrap_or_default().to_string();
    let commits: Vec<Value> = (1..=3)
        .map(|i| {
            json!({
                "url": format!("{base}/repos/{owner}/{repo}/commits/{head}{i}"),
                "commit": {"message": format!("change {i} of {head}")}
            })
        })
        .collect();
    Json(json!({ "commits": commits }))
}

async fn commit(State(up): State<Arc<Upstream>>) -> Response {
    up.commit_calls.fetch_add(1, Ordering::SeqCst);
    if let Some(status) = up.commit_status {
        return (status, "Not Found").into_response();
    }
    Json(json!({
        "files": [
            {"filename": "src/lib.rs", "patch": "@@ -1 +1 @@\n-old\n+new"},
            {"filename": "logo.png"}
        ]
    }))
    .into_response()
}

async fn readme(State(up): State<Arc<Upstream>>) -> Json<Value> {
    up.readme_calls.fetch_add(1, Ordering::SeqCst);
    Json(json!({ "content": README_B64 }))
}

async fn generate(
    State(up): State<Arc<Upstream>>,
    Path(model): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let overloaded = up
        .gemini_overloads
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok();
    if overloaded {
        return (StatusCode::SERVICE_UNAVAILABLE, "The model is overloaded.").into_response();
    }

    let prompt = body["contents"][0]["parts"][0]["text"]
        .as_str()
        .unwrap_or_default()
        .to_string();
    up.prompts.lock().unwrap().push(prompt);

    let text = if model.contains("lite") {
        up.commit_summary_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(status) = up.commit_model_status {
            return (status, "Invalid request").into_response();
        }
        "tidied the parser"
    } else {
        up.summary_calls.fetch_add(1, Ordering::SeqCst);
        "Octocat has been busy fixing bugs."
    };
    Json(json!({
        "candidates": [{"content": {"parts": [{"text": text}]}}]
    }))
    .into_response()
}

/// Helper: spawn the fake upstream on port 0 and return its base URL.
async fn spawn_upstream(upstream: Upstream) -> (Arc<Upstream>, String) {
    let up = Arc::new(upstream);
    let app = Router::new()
        .route("/users/{user}/events", get(events))
        .route("/repos/{owner}/{repo}/compare/{range}", get(compare))
        .route("/repos/{owner}/{repo}/commits/{sha}", get(commit))
        .route("/repos/{owner}/{repo}/contents/README.md", get(readme))
        .route("/v1beta/models/{model}", post(generate))
        .with_state(up.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    up.base.set(base.clone()).unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (up, base)
}

fn issue_event(id: usize, repo: &str) -> Value {
    json!({
        "id": id.to_string(),
        "type": "IssueCommentEvent",
        "repo": {"name": repo},
        "payload": {
            "action": "created",
            "issue": {"title": format!("Bug {id}"), "body": "steps"}
        }
    })
}

fn push_event(id: usize, repo: &str) -> Value {
    json!({
        "id": id.to_string(),
        "type": "PushEvent",
        "repo": {"name": repo},
        "payload": {"before": format!("b{id}"), "head": format!("h{id}")}
    })
}

fn empty_push_event(id: usize, repo: &str) -> Value {
    json!({
        "id": id.to_string(),
        "type": "PushEvent",
        "repo": {"name": repo},
        "payload": {
            "before": "0000000000000000000000000000000000000000",
            "head": format!("h{id}"),
            "commits": []
        }
    })
}

fn watch_event(id: usize) -> Value {
    json!({"id": id.to_string(), "type": "WatchEvent", "repo": {"name": "o/r"}})
}

fn github(base: &str) -> GitHubClient {
    GitHubClient::new(base, None, std::time::Duration::from_secs(5)).unwrap()
}

fn commit_summarizer(base: &str) -> Summarizer {
    let gemini = GeminiClient::new(
        base,
        Some("test-key".into()),
        "gemini-2.5-flash-lite",
        std::time::Duration::from_secs(5),
    )
    .unwrap();
    Summarizer::new(Arc::new(gemini), RetryPolicy::immediate(0))
}

fn test_config(base: &str) -> SummaryConfig {
    SummaryConfig::default()
        .with_endpoints(base, base)
        .with_gemini_api_key("test-key")
        .with_retry(RetryPolicy::immediate(5), RetryPolicy::immediate(5))
}

// ── Aggregation ──────────────────────────────────────────────────────

#[tokio::test]
async fn readme_is_fetched_once_per_repository() {
    let page: Vec<Value> = (1..=5).map(|i| issue_event(i, "o/r")).collect();
    let (up, base) = spawn_upstream(Upstream::with_pages(vec![page])).await;
    let client = github(&base);

    let aggregation = Aggregator::new(&client, Budgets::default(), Mode::Fast)
        .aggregate("octocat", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(aggregation.activities.len(), 5);
    assert_eq!(aggregation.repositories.len(), 1);
    assert_eq!(up.readme_calls.load(Ordering::SeqCst), 1);
    // Page 2 is empty and ends pagination.
    assert_eq!(up.event_calls.load(Ordering::SeqCst), 2);

    let narrative = aggregation.narrative();
    assert!(narrative.starts_with("Recent activities for user octocat:\n"));
    assert!(narrative.contains("o/r repository description:\n# Demo\n"));
    for activity in &aggregation.activities {
        assert!(narrative.contains(activity.content()));
    }
    assert!(narrative.contains("Type: IssueCommentEvent\nRepository: o/r\n"));
}

#[tokio::test]
async fn pagination_stops_at_page_ceiling() {
    let page: Vec<Value> = (1..=4).map(watch_event).collect();
    let (up, base) =
        spawn_upstream(Upstream::with_pages(vec![page.clone(), page.clone(), page.clone(), page])).await;
    let client = github(&base);

    let aggregation = Aggregator::new(&client, Budgets::default(), Mode::Fast)
        .aggregate("octocat", &CancellationToken::new())
        .await
        .unwrap();

    assert!(aggregation.activities.is_empty());
    assert_eq!(aggregation.pages_fetched, 3);
    assert_eq!(up.event_calls.load(Ordering::SeqCst), 3);
    assert_eq!(up.readme_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn activities_never_exceed_event_budget() {
    let pages: Vec<Vec<Value>> = (0..3)
        .map(|p| (1..=30).map(|i| issue_event(p * 100 + i, "o/r")).collect())
        .collect();
    let (_up, base) = spawn_upstream(Upstream::with_pages(pages)).await;
    let client = github(&base);

    let budgets = Budgets::default().with_max_events(5);
    let aggregation = Aggregator::new(&client, budgets, Mode::Fast)
        .aggregate("octocat", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(aggregation.activities.len(), 5);
    assert!(aggregation.pages_fetched <= 3);
}

#[tokio::test]
async fn enough_activity_stops_after_first_page() {
    let page: Vec<Value> = (1..=12).map(|i| issue_event(i, "o/r")).collect();
    let (up, base) = spawn_upstream(Upstream::with_pages(vec![page])).await;
    let client = github(&base);

    let aggregation = Aggregator::new(&client, Budgets::default(), Mode::Fast)
        .aggregate("octocat", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(aggregation.activities.len(), 12);
    assert_eq!(up.event_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn event_fetch_failure_is_fatal() {
    let (_up, base) = spawn_upstream(Upstream {
        events_status: Some(StatusCode::INTERNAL_SERVER_ERROR),
        ..Default::default()
    })
    .await;
    let client = github(&base);

    let err = Aggregator::new(&client, Budgets::default(), Mode::Fast)
        .aggregate("octocat", &CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        SummaryError::Upstream { status, body } => {
            assert_eq!(status, 500);
            assert!(body.contains("upstream exploded"));
        }
        other => panic!("expected upstream error, got {other:?}"),
    }
}

#[tokio::test]
async fn fast_mode_uses_compare_messages() {
    let page = vec![push_event(1, "o/r")];
    let (up, base) = spawn_upstream(Upstream::with_pages(vec![page])).await;
    let client = github(&base);

    let aggregation = Aggregator::new(&client, Budgets::default(), Mode::Fast)
        .aggregate("octocat", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(aggregation.activities.len(), 1);
    assert_eq!(
        aggregation.activities[0].content(),
        "change 1 of h1\nchange 2 of h1\nchange 3 of h1\n"
    );
    assert_eq!(up.compare_calls.load(Ordering::SeqCst), 1);
    assert_eq!(up.commit_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn strict_mode_respects_commit_budget() {
    let page: Vec<Value> = (1..=4).map(|i| push_event(i, "o/r")).collect();
    let (up, base) = spawn_upstream(Upstream::with_pages(vec![page])).await;
    let client = github(&base);
    let commit_summarizer = commit_summarizer(&base);

    let aggregation = Aggregator::new(&client, Budgets::default(), Mode::Strict)
        .with_commit_summarizer(&commit_summarizer)
        .aggregate("octocat", &CancellationToken::new())
        .await
        .unwrap();

    // 4 pushes x 3 commits, budget of 10.
    assert_eq!(aggregation.commit_summary_attempts, 10);
    assert_eq!(up.commit_calls.load(Ordering::SeqCst), 10);
    assert_eq!(up.commit_summary_calls.load(Ordering::SeqCst), 10);

    assert_eq!(
        aggregation.activities[0].content(),
        "Commit summary: tidied the parser\n".repeat(3)
    );
    assert_eq!(
        aggregation.activities[3].content(),
        "Commit summary: tidied the parser\nchange 2 of h4\nchange 3 of h4\n"
    );

    let prompts = up.prompts.lock().unwrap();
    assert!(prompts[0].starts_with("Commit message: change 1 of h1\n"));
    assert!(prompts[0].contains("File: src/lib.rs\nPatch:\n"));
    assert!(!prompts[0].contains("logo.png"));
}

#[tokio::test]
async fn strict_mode_keeps_raw_messages_when_commit_fetch_fails() {
    let page: Vec<Value> = (1..=4).map(|i| push_event(i, "o/r")).collect();
    let (up, base) = spawn_upstream(Upstream {
        pages: vec![page],
        commit_status: Some(StatusCode::NOT_FOUND),
        ..Default::default()
    })
    .await;
    let client = github(&base);
    let commit_summarizer = commit_summarizer(&base);

    let aggregation = Aggregator::new(&client, Budgets::default(), Mode::Strict)
        .with_commit_summarizer(&commit_summarizer)
        .aggregate("octocat", &CancellationToken::new())
        .await
        .unwrap();

    // Failed fetches still spend the budget.
    assert_eq!(aggregation.commit_summary_attempts, 10);
    assert_eq!(up.commit_calls.load(Ordering::SeqCst), 10);
    assert_eq!(up.commit_summary_calls.load(Ordering::SeqCst), 0);
    assert_eq!(aggregation.activities.len(), 4);
    for (i, activity) in aggregation.activities.iter().enumerate() {
        let head = format!("h{}", i + 1);
        assert_eq!(
            activity.content(),
            format!("change 1 of {head}\nchange 2 of {head}\nchange 3 of {head}\n")
        );
    }
}

#[tokio::test]
async fn strict_mode_keeps_raw_messages_when_model_rejects() {
    let page: Vec<Value> = (1..=4).map(|i| push_event(i, "o/r")).collect();
    let (up, base) = spawn_upstream(Upstream {
        pages: vec![page],
        commit_model_status: Some(StatusCode::BAD_REQUEST),
        ..Default::default()
    })
    .await;
    let client = github(&base);
    let commit_summarizer = commit_summarizer(&base);

    let aggregation = Aggregator::new(&client, Budgets::default(), Mode::Strict)
        .with_commit_summarizer(&commit_summarizer)
        .aggregate("octocat", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(aggregation.commit_summary_attempts, 10);
    assert_eq!(up.commit_calls.load(Ordering::SeqCst), 10);
    // A 400 is not retried.
    assert_eq!(up.commit_summary_calls.load(Ordering::SeqCst), 10);
    assert!(
        aggregation
            .activities
            .iter()
            .all(|a| !a.content().contains("Commit summary"))
    );
    assert_eq!(
        aggregation.activities[0].content(),
        "change 1 of h1\nchange 2 of h1\nchange 3 of h1\n"
    );
}

#[tokio::test]
async fn commit_attempts_stop_at_commit_count_under_budget() {
    let page: Vec<Value> = (1..=2).map(|i| push_event(i, "o/r")).collect();
    let (up, base) = spawn_upstream(Upstream {
        pages: vec![page],
        commit_status: Some(StatusCode::NOT_FOUND),
        ..Default::default()
    })
    .await;
    let client = github(&base);
    let commit_summarizer = commit_summarizer(&base);

    let aggregation = Aggregator::new(&client, Budgets::default(), Mode::Strict)
        .with_commit_summarizer(&commit_summarizer)
        .aggregate("octocat", &CancellationToken::new())
        .await
        .unwrap();

    // 2 pushes x 3 commits, fewer than the budget of 10.
    assert_eq!(aggregation.commit_summary_attempts, 6);
    assert_eq!(up.commit_calls.load(Ordering::SeqCst), 6);
}

#[tokio::test]
async fn push_without_commits_adds_no_repository() {
    let page = vec![empty_push_event(1, "o/empty"), issue_event(2, "o/r")];
    let (up, base) = spawn_upstream(Upstream::with_pages(vec![page])).await;
    let client = github(&base);

    let aggregation = Aggregator::new(&client, Budgets::default(), Mode::Fast)
        .aggregate("octocat", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(aggregation.activities.len(), 1);
    assert_eq!(aggregation.repositories.iter().collect::<Vec<_>>(), vec!["o/r"]);
    assert_eq!(up.readme_calls.load(Ordering::SeqCst), 1);
    assert_eq!(up.compare_calls.load(Ordering::SeqCst), 0);
}

// ── Service ──────────────────────────────────────────────────────────

#[tokio::test]
async fn service_renders_svg_end_to_end() {
    let page = vec![issue_event(1, "o/r"), push_event(2, "o/s")];
    let (up, base) = spawn_upstream(Upstream::with_pages(vec![page])).await;
    let service = SummaryService::new(test_config(&base)).unwrap();

    let request = SummaryRequest::new("octocat").with_pronouns("they/them");
    let svg = service
        .render_svg(&request, &CancellationToken::new())
        .await
        .unwrap();

    assert!(svg.starts_with(r#"<svg xmlns="http://www.w3.org/2000/svg" width="480""#));
    assert!(svg.contains("Octocat has been busy fixing bugs."));
    assert_eq!(up.summary_calls.load(Ordering::SeqCst), 1);
    assert_eq!(up.readme_calls.load(Ordering::SeqCst), 2);

    let prompts = up.prompts.lock().unwrap();
    let narrative = prompts.last().unwrap();
    assert!(narrative.contains("Type: IssueCommentEvent\nRepository: o/r\nContent: Issue created: Bug 1\nsteps"));
    assert!(narrative.contains("Type: PushEvent\nRepository: o/s\n"));
}

#[tokio::test]
async fn overloaded_model_is_retried() {
    let (up, base) = spawn_upstream(Upstream {
        pages: vec![vec![issue_event(1, "o/r")]],
        gemini_overloads: AtomicUsize::new(2),
        ..Default::default()
    })
    .await;
    let service = SummaryService::new(test_config(&base)).unwrap();

    let summary = service
        .summarize(&SummaryRequest::new("octocat"), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary, "Octocat has been busy fixing bugs.");
    assert_eq!(up.summary_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn persistent_overload_exhausts_retries() {
    let (_up, base) = spawn_upstream(Upstream {
        pages: vec![vec![issue_event(1, "o/r")]],
        gemini_overloads: AtomicUsize::new(100),
        ..Default::default()
    })
    .await;
    let service = SummaryService::new(test_config(&base)).unwrap();

    let err = service
        .summarize(&SummaryRequest::new("octocat"), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, SummaryError::ExhaustedRetries { attempts: 6, .. }));
}

#[tokio::test]
async fn missing_gemini_key_is_reported() {
    let (up, base) = spawn_upstream(Upstream::with_pages(vec![vec![issue_event(1, "o/r")]])).await;
    let config = SummaryConfig::default().with_endpoints(&base, &base);
    let service = SummaryService::new(config).unwrap();

    let err = service
        .summarize(&SummaryRequest::new("octocat"), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, SummaryError::Credential));
    assert_eq!(up.summary_calls.load(Ordering::SeqCst), 0);
}
