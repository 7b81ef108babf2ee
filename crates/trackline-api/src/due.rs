//! Handler for `/tracking/due` — the scheduler entry point.
//!
//! An external job runner calls this on a fixed interval, hands each id to
//! the carrier poll adapter, and posts the results back through
//! `POST /tracks/:number/statuses`.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Query, State},
};
use serde::{Deserialize, Serialize};
use trackline_core::{scheduler::DEFAULT_LIMIT, store::TrackStore};
use uuid::Uuid;

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct DueParams {
  /// Comma-separated shard keys (single hex digits), e.g. `"0,1,2,3"`.
  pub shards: Option<String>,
  pub limit:  Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct DueTrack {
  pub id:     Uuid,
  pub number: String,
}

/// `GET /tracking/due[?shards=0,1,2][&limit=3000]`
pub async fn handler<S>(
  State(store): State<Arc<S>>,
  Query(params): Query<DueParams>,
) -> Result<Json<Vec<DueTrack>>, ApiError>
where
  S: TrackStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let shards = params
    .shards
    .as_deref()
    .map(parse_shards)
    .transpose()?;

  let due = store
    .select_due(shards.as_deref(), params.limit.unwrap_or(DEFAULT_LIMIT))
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;

  Ok(Json(
    due
      .iter()
      .map(|t| DueTrack { id: t.id, number: t.number.clone() })
      .collect(),
  ))
}

fn parse_shards(s: &str) -> Result<Vec<char>, ApiError> {
  s.split(',')
    .map(str::trim)
    .filter(|part| !part.is_empty())
    .map(|part| {
      let mut chars = part.chars();
      match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_hexdigit() => Ok(c.to_ascii_lowercase()),
        _ => Err(ApiError::BadRequest(format!("invalid shard key: {part:?}"))),
      }
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parse_shards_accepts_hex_digits() {
    assert_eq!(parse_shards("0,a,F").unwrap(), vec!['0', 'a', 'f']);
    assert_eq!(parse_shards(" 1 , 2 ").unwrap(), vec!['1', '2']);
  }

  #[test]
  fn parse_shards_rejects_junk() {
    assert!(parse_shards("0,zz").is_err());
    assert!(parse_shards("g").is_err());
  }
}
