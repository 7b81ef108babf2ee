//! The `TrackStore` trait.
//!
//! Implemented by storage backends (e.g. `trackline-store-sqlite`). Higher
//! layers (`trackline-api`, the server) depend on this abstraction, not on
//! any concrete backend.
//!
//! Round-trip fidelity is load-bearing: a backend must hand back the status
//! history in the exact order it was saved and the notified fingerprint list
//! unchanged, or notification idempotence breaks.

use std::future::Future;

use uuid::Uuid;

use crate::track::Track;

/// Abstraction over a track storage backend.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (tokio with `axum`).
///
/// Read-modify-write of a single track must be serialized by the caller;
/// the store does not arbitrate concurrent updates to one track.
pub trait TrackStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Persist a newly registered track.
  fn insert<'a>(
    &'a self,
    track: &'a Track,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Write back a mutated track (history, notified set, scheduling fields).
  fn update<'a>(
    &'a self,
    track: &'a Track,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Fetch by id. Returns `None` if not found.
  fn get(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Track>, Self::Error>> + Send + '_;

  /// Fetch by carrier tracking number. Returns `None` if not found.
  fn find_by_number<'a>(
    &'a self,
    number: &'a str,
  ) -> impl Future<Output = Result<Option<Track>, Self::Error>> + Send + 'a;

  /// Tracks due for a poll (see [`crate::scheduler::is_due`]), optionally
  /// restricted to the given shard keys, ordered ascending by
  /// `last_polled_at` with never-polled tracks first, capped at `limit`.
  fn select_due<'a>(
    &'a self,
    shards: Option<&'a [char]>,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<Track>, Self::Error>> + Send + 'a;
}
