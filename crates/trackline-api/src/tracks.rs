//! Handlers for `/tracks` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/tracks` | Register a shipment; returns 201 + [`TrackView`] |
//! | `GET`  | `/tracks/:number/statuses` | Canonically sorted history |
//! | `POST` | `/tracks/:number/statuses` | Poll-adapter push; runs ingest |
//! | `POST` | `/tracks/:id/stop` | Soft stop; the scheduler skips it |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use trackline_core::{
  notify::{Notifier, OfficeInfo},
  status::{LifecycleCode, StatusRecord},
  store::TrackStore,
  track::{OwnerRef, Track},
};
use uuid::Uuid;

use crate::error::ApiError;

// ─── Views ────────────────────────────────────────────────────────────────────

/// Serialisable projection of a [`Track`] (the aggregate itself keeps its
/// history and notified set private).
#[derive(Debug, Serialize)]
pub struct TrackView {
  pub id:             Uuid,
  pub number:         String,
  pub shipping_id:    String,
  pub order_id:       String,
  pub is_cod:         bool,
  pub shard:          char,
  pub created_at:     DateTime<Utc>,
  pub stopped_at:     Option<DateTime<Utc>>,
  pub last_polled_at: Option<DateTime<Utc>>,
  pub notified_at:    Option<DateTime<Utc>>,
}

impl From<&Track> for TrackView {
  fn from(t: &Track) -> Self {
    Self {
      id:             t.id,
      number:         t.number.clone(),
      shipping_id:    t.shipping_id.clone(),
      order_id:       t.order_id.clone(),
      is_cod:         t.is_cod,
      shard:          t.shard,
      created_at:     t.created_at,
      stopped_at:     t.stopped_at,
      last_polled_at: t.last_polled_at,
      notified_at:    t.notified_at,
    }
  }
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// JSON body accepted by `POST /tracks`.
#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub number:      String,
  pub shipping_id: String,
  pub order_id:    String,
  #[serde(default)]
  pub is_cod:      bool,
  pub owner:       OwnerRef,
  pub office:      Option<OfficeInfo>,
}

/// `POST /tracks` — register a shipment for tracking.
pub async fn create<S>(
  State(store): State<Arc<S>>,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: TrackStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let mut track = Track::new(
    body.owner,
    body.number,
    body.shipping_id,
    body.order_id,
    body.is_cod,
  );
  track.office = body.office;

  store
    .insert(&track)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;

  Ok((StatusCode::CREATED, Json(TrackView::from(&track))))
}

// ─── Read statuses ────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct StatusesView {
  pub statuses: Vec<StatusRecord>,
}

/// `GET /tracks/:number/statuses` — the timeline in canonical order.
pub async fn get_statuses<S>(
  State(store): State<Arc<S>>,
  Path(number): Path<String>,
) -> Result<Json<StatusesView>, ApiError>
where
  S: TrackStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let track = store
    .find_by_number(&number)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or_else(|| {
      ApiError::NotFound(format!("track with number {number} is not found"))
    })?;

  Ok(Json(StatusesView { statuses: track.sorted_statuses() }))
}

// ─── Push statuses (poll-adapter boundary) ────────────────────────────────────

/// One carrier record as supplied by a poll adapter: snake_case code string
/// and a unix-second timestamp.
#[derive(Debug, Deserialize)]
pub struct StatusBody {
  pub code:      String,
  #[serde(default)]
  pub text:      String,
  pub timestamp: i64,
}

#[derive(Debug, Deserialize)]
pub struct PushBody {
  pub statuses: Vec<StatusBody>,
}

#[derive(Debug, Serialize)]
pub struct PushOutcome {
  /// How many records the merge actually added.
  pub added:    usize,
  /// The record handed to the notification outbox, if any.
  pub notified: Option<StatusRecord>,
}

/// `POST /tracks/:number/statuses` — fold a freshly polled batch into the
/// track. Validation failures reject the whole batch before anything merges.
pub async fn push_statuses<S>(
  State(store): State<Arc<S>>,
  Path(number): Path<String>,
  Json(body): Json<PushBody>,
) -> Result<Json<PushOutcome>, ApiError>
where
  S: TrackStore + Notifier,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let incoming = body
    .statuses
    .into_iter()
    .map(|s| {
      let code = LifecycleCode::parse(&s.code)
        .map_err(|e| ApiError::Invalid(e.to_string()))?;
      let ts = DateTime::<Utc>::from_timestamp(s.timestamp, 0).ok_or_else(
        || ApiError::Invalid(format!("timestamp {} out of range", s.timestamp)),
      )?;
      StatusRecord::new(code, s.text, ts)
        .map_err(|e| ApiError::Invalid(e.to_string()))
    })
    .collect::<Result<Vec<_>, ApiError>>()?;

  let mut track = store
    .find_by_number(&number)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or_else(|| {
      ApiError::NotFound(format!("track with number {number} is not found"))
    })?;

  let before = track.statuses().len();
  track.set_last_polled();

  let notified =
    track
      .ingest(&incoming, store.as_ref())
      .await
      .map_err(|e| match e {
        trackline_core::Error::Notify(err) => ApiError::Notify(err.to_string()),
        other => ApiError::Invalid(other.to_string()),
      })?;

  store
    .update(&track)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;

  Ok(Json(PushOutcome {
    added: track.statuses().len() - before,
    notified,
  }))
}

// ─── Stop ─────────────────────────────────────────────────────────────────────

/// `POST /tracks/:id/stop` — soft stop: the record remains, the scheduler
/// excludes it from now on.
pub async fn stop<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<TrackView>, ApiError>
where
  S: TrackStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let mut track = store
    .get(id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or_else(|| ApiError::NotFound(format!("track {id} not found")))?;

  if !track.is_stopped() {
    track.stop();
    store
      .update(&track)
      .await
      .map_err(|e| ApiError::Store(Box::new(e)))?;
  }

  Ok(Json(TrackView::from(&track)))
}
