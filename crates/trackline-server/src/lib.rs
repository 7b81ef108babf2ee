//! HTTP server assembly for Trackline.
//!
//! Mounts the JSON API under `/api` on top of an in-process SQLite store and
//! adds request tracing. Carrier polling itself lives outside this process;
//! a job runner drives it through `/api/tracking/due` and posts results back
//! via `/api/tracks/:number/statuses`.

use std::{path::PathBuf, sync::Arc};

use axum::Router;
use serde::Deserialize;
use tower_http::trace::TraceLayer;
use trackline_core::{notify::Notifier, store::TrackStore};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml`.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  pub store_path: PathBuf,
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the full application router for `store`.
pub fn router<S>(store: Arc<S>) -> Router
where
  S: TrackStore + Notifier + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  Router::new()
    .nest("/api", trackline_api::api_router(store))
    .layer(TraceLayer::new_for_http())
}

// ─── Integration tests ────────────────────────────────────────────────────────
