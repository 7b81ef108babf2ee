//! JSON REST API for Trackline.
//!
//! Exposes an axum [`Router`] backed by any store that is both a
//! [`trackline_core::store::TrackStore`] and a
//! [`trackline_core::notify::Notifier`] (the SQLite store is both, via its
//! outbox table). TLS and transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", trackline_api::api_router(store.clone()))
//! ```

pub mod due;
pub mod error;
pub mod tracks;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use trackline_core::{notify::Notifier, store::TrackStore};

pub use error::ApiError;

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: TrackStore + Notifier + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  Router::new()
    // Tracks
    .route("/tracks", post(tracks::create::<S>))
    .route(
      "/tracks/{number}/statuses",
      get(tracks::get_statuses::<S>).post(tracks::push_statuses::<S>),
    )
    .route("/tracks/{id}/stop", post(tracks::stop::<S>))
    // Scheduler entry point
    .route("/tracking/due", get(due::handler::<S>))
    .with_state(store)
}
