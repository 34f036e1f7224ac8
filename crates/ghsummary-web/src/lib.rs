//! HTTP endpoint serving GitHub activity summaries as SVG images.
//!
//! `ghsummary-web` wraps a shared [`SummaryService`] in an axum router so the
//! card can be embedded straight from a README:
//!
//! ```markdown
//! ![activity](https://example.com/api?username=octocat)
//! ```
//!
//! # Quick start
//!
//! ```ignore
//! use ghsummary::{SummaryConfig, SummaryService};
//! use ghsummary_web::{WebConfig, spawn_web};
//! use std::sync::Arc;
//!
//! let service = Arc::new(SummaryService::new(SummaryConfig::from_env())?);
//! let addr = spawn_web(service, WebConfig::default()).await?;
//! println!("Serving on http://{addr}");
//! ```
//!
//! # Routes
//!
//! | Route | Description |
//! |-------|-------------|
//! | `GET /`, `GET /api` | `?username=&max-events=&mode=&pronouns=` → `image/svg+xml` |
//! | `GET /healthz` | Liveness probe, returns `ok` |

mod api;
mod server;

pub use api::AppState;
pub use server::{build_router, start_server};

use std::net::SocketAddr;
use std::sync::Arc;

use ghsummary::SummaryService;
use tokio_util::sync::CancellationToken;

/// Configuration for the web server.
pub struct WebConfig {
    /// Address to bind to. Default: `127.0.0.1:3001`.
    pub bind_addr: SocketAddr,
    /// Cancelled to stop the server and abort in-flight summaries.
    pub shutdown: CancellationToken,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3001)),
            shutdown: CancellationToken::new(),
        }
    }
}

/// Spawn the web server on a Tokio task and return the bound address.
///
/// The server runs until `config.shutdown` is cancelled or the Tokio
/// runtime shuts down.
pub async fn spawn_web(
    service: Arc<SummaryService>,
    config: WebConfig,
) -> std::io::Result<SocketAddr> {
    let state = AppState {
        service,
        shutdown: config.shutdown.clone(),
    };
    let router = build_router(state);
    start_server(router, config.bind_addr, config.shutdown).await
}
