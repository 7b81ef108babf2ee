//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings, UUIDs hyphenated lowercase strings.
//! The status history and notified-fingerprint list are JSON arrays whose
//! element order is preserved exactly — round-trip fidelity of both is what
//! keeps notification selection idempotent across restarts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use trackline_core::{
  notify::OfficeInfo,
  status::{Fingerprint, LifecycleCode, StatusRecord},
  track::{OwnerRef, Track},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn decode_dt_opt(s: Option<&str>) -> Result<Option<DateTime<Utc>>> {
  s.map(decode_dt).transpose()
}

// ─── Status history ──────────────────────────────────────────────────────────

/// On-disk shape of one status record: snake_case code string plus a
/// unix-second timestamp, matching the fingerprint's view of the record.
#[derive(Serialize, Deserialize)]
struct RawStatus {
  code:      String,
  text:      String,
  timestamp: i64,
}

pub fn encode_statuses(statuses: &[StatusRecord]) -> Result<String> {
  let raw: Vec<RawStatus> = statuses
    .iter()
    .map(|s| RawStatus {
      code:      s.code().as_str().to_owned(),
      text:      s.text().to_owned(),
      timestamp: s.timestamp().timestamp(),
    })
    .collect();
  Ok(serde_json::to_string(&raw)?)
}

pub fn decode_statuses(s: &str) -> Result<Vec<StatusRecord>> {
  let raw: Vec<RawStatus> = serde_json::from_str(s)?;
  raw
    .into_iter()
    .map(|r| {
      let code = LifecycleCode::parse(&r.code)?;
      let ts = DateTime::<Utc>::from_timestamp(r.timestamp, 0)
        .ok_or_else(|| Error::Corrupt(format!("timestamp {}", r.timestamp)))?;
      Ok(StatusRecord::new(code, r.text, ts)?)
    })
    .collect()
}

// ─── Notified fingerprints ───────────────────────────────────────────────────

pub fn encode_notified(notified: &[Fingerprint]) -> Result<String> {
  Ok(serde_json::to_string(notified)?)
}

pub fn decode_notified(s: &str) -> Result<Vec<Fingerprint>> {
  Ok(serde_json::from_str(s)?)
}

// ─── Office ──────────────────────────────────────────────────────────────────

pub fn encode_office(office: Option<&OfficeInfo>) -> Result<Option<String>> {
  office.map(|o| Ok(serde_json::to_string(o)?)).transpose()
}

pub fn decode_office(s: Option<&str>) -> Result<Option<OfficeInfo>> {
  s.map(|o| Ok(serde_json::from_str(o)?)).transpose()
}

// ─── Row type ────────────────────────────────────────────────────────────────

/// Raw strings read directly from a `tracks` row.
pub struct RawTrack {
  pub id:             String,
  pub company_id:     String,
  pub plugin_alias:   String,
  pub plugin_id:      String,
  pub number:         String,
  pub shipping_id:    String,
  pub order_id:       String,
  pub is_cod:         bool,
  pub created_at:     String,
  pub next_poll_at:   Option<String>,
  pub last_polled_at: Option<String>,
  pub stopped_at:     Option<String>,
  pub notified_at:    Option<String>,
  pub shard:          String,
  pub office:         Option<String>,
  pub statuses:       String,
  pub notified:       String,
}

impl RawTrack {
  pub fn into_track(self) -> Result<Track> {
    let shard = match self.shard.chars().next() {
      Some(c) if self.shard.chars().count() == 1 && c.is_ascii_hexdigit() => c,
      _ => return Err(Error::Corrupt(format!("shard {:?}", self.shard))),
    };

    Ok(Track::from_parts(
      decode_uuid(&self.id)?,
      OwnerRef {
        company_id:   self.company_id,
        plugin_alias: self.plugin_alias,
        plugin_id:    self.plugin_id,
      },
      self.number,
      self.shipping_id,
      self.order_id,
      self.is_cod,
      decode_dt(&self.created_at)?,
      decode_dt_opt(self.next_poll_at.as_deref())?,
      decode_dt_opt(self.last_polled_at.as_deref())?,
      decode_dt_opt(self.stopped_at.as_deref())?,
      decode_dt_opt(self.notified_at.as_deref())?,
      shard,
      decode_office(self.office.as_deref())?,
      decode_statuses(&self.statuses)?,
      decode_notified(&self.notified)?,
    ))
  }
}
