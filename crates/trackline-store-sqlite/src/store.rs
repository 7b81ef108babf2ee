//! [`SqliteStore`] — the SQLite implementation of
//! [`TrackStore`](trackline_core::store::TrackStore) and
//! [`Notifier`](trackline_core::notify::Notifier).

use std::path::Path;

use chrono::{Duration, Utc};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use trackline_core::{
  notify::{NotificationTask, Notifier, NotifyError},
  scheduler::{POLL_SPACING_MINUTES, TRACKING_WINDOW_DAYS},
  store::TrackStore,
  track::Track,
};

use crate::{
  Error, Result,
  encode::{
    RawTrack, encode_dt, encode_notified, encode_office, encode_statuses,
    encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A track store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

const TRACK_COLUMNS: &str = "id, company_id, plugin_alias, plugin_id, number, \
   shipping_id, order_id, is_cod, created_at, next_poll_at, last_polled_at, \
   stopped_at, notified_at, shard, office, statuses, notified";

fn raw_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawTrack> {
  Ok(RawTrack {
    id:             row.get(0)?,
    company_id:     row.get(1)?,
    plugin_alias:   row.get(2)?,
    plugin_id:      row.get(3)?,
    number:         row.get(4)?,
    shipping_id:    row.get(5)?,
    order_id:       row.get(6)?,
    is_cod:         row.get(7)?,
    created_at:     row.get(8)?,
    next_poll_at:   row.get(9)?,
    last_polled_at: row.get(10)?,
    stopped_at:     row.get(11)?,
    notified_at:    row.get(12)?,
    shard:          row.get(13)?,
    office:         row.get(14)?,
    statuses:       row.get(15)?,
    notified:       row.get(16)?,
  })
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Column values for INSERT/UPDATE, in `TRACK_COLUMNS` order.
  fn track_values(track: &Track) -> Result<Vec<Option<String>>> {
    Ok(vec![
      Some(encode_uuid(track.id)),
      Some(track.owner.company_id.clone()),
      Some(track.owner.plugin_alias.clone()),
      Some(track.owner.plugin_id.clone()),
      Some(track.number.clone()),
      Some(track.shipping_id.clone()),
      Some(track.order_id.clone()),
      Some(if track.is_cod { "1" } else { "0" }.to_owned()),
      Some(encode_dt(track.created_at)),
      track.next_poll_at.map(encode_dt),
      track.last_polled_at.map(encode_dt),
      track.stopped_at.map(encode_dt),
      track.notified_at.map(encode_dt),
      Some(track.shard.to_string()),
      encode_office(track.office.as_ref())?,
      Some(encode_statuses(track.statuses())?),
      Some(encode_notified(track.notified())?),
    ])
  }

  /// JSON payloads of all queued notification tasks, oldest first.
  /// Consumed by the external delivery worker.
  pub async fn pending_notifications(&self) -> Result<Vec<String>> {
    let payloads = self
      .conn
      .call(|conn| {
        let mut stmt =
          conn.prepare("SELECT payload FROM outbox ORDER BY created_at")?;
        let rows = stmt
          .query_map([], |row| row.get::<_, String>(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(payloads)
  }
}

// ─── TrackStore impl ─────────────────────────────────────────────────────────

impl TrackStore for SqliteStore {
  type Error = Error;

  async fn insert(&self, track: &Track) -> Result<()> {
    let values = Self::track_values(track)?;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          &format!(
            "INSERT INTO tracks ({TRACK_COLUMNS}) VALUES \
             (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, \
              ?15, ?16, ?17)"
          ),
          rusqlite::params_from_iter(values),
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn update(&self, track: &Track) -> Result<()> {
    let mut values = Self::track_values(track)?;
    // WHERE clause takes the id; move it to the end.
    let id = values.remove(0);
    values.push(id);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE tracks SET
             company_id = ?1, plugin_alias = ?2, plugin_id = ?3, number = ?4,
             shipping_id = ?5, order_id = ?6, is_cod = ?7, created_at = ?8,
             next_poll_at = ?9, last_polled_at = ?10, stopped_at = ?11,
             notified_at = ?12, shard = ?13, office = ?14, statuses = ?15,
             notified = ?16
           WHERE id = ?17",
          rusqlite::params_from_iter(values),
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn get(&self, id: Uuid) -> Result<Option<Track>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawTrack> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {TRACK_COLUMNS} FROM tracks WHERE id = ?1"),
              rusqlite::params![id_str],
              raw_from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawTrack::into_track).transpose()
  }

  async fn find_by_number(&self, number: &str) -> Result<Option<Track>> {
    let number = number.to_owned();

    let raw: Option<RawTrack> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {TRACK_COLUMNS} FROM tracks WHERE number = ?1 LIMIT 1"
              ),
              rusqlite::params![number],
              raw_from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawTrack::into_track).transpose()
  }

  async fn select_due(
    &self,
    shards: Option<&[char]>,
    limit: usize,
  ) -> Result<Vec<Track>> {
    let now = Utc::now();
    let window_start = encode_dt(now - Duration::days(TRACKING_WINDOW_DAYS));
    let now_str = encode_dt(now);
    let spacing_cutoff =
      encode_dt(now - Duration::minutes(POLL_SPACING_MINUTES));

    // Shard keys are single hex digits; anything else is dropped before the
    // literal IN list is built.
    let shard_clause = shards.map(|shards| {
      let list: Vec<String> = shards
        .iter()
        .filter(|c| c.is_ascii_hexdigit())
        .map(|c| format!("'{c}'"))
        .collect();
      format!("AND shard IN ({})", list.join(", "))
    });

    let limit = limit as i64;

    let raws: Vec<RawTrack> = self
      .conn
      .call(move |conn| {
        // RFC 3339 UTC strings compare correctly as text. Ascending ORDER BY
        // puts NULL last_polled_at (never polled) first.
        let sql = format!(
          "SELECT {TRACK_COLUMNS} FROM tracks
           WHERE created_at >= ?1
             AND stopped_at IS NULL
             AND (next_poll_at IS NULL OR next_poll_at <= ?2)
             AND (last_polled_at IS NULL OR last_polled_at <= ?3)
             {}
           ORDER BY last_polled_at ASC
           LIMIT ?4",
          shard_clause.as_deref().unwrap_or("")
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(
            rusqlite::params![window_start, now_str, spacing_cutoff, limit],
            raw_from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawTrack::into_track).collect()
  }
}

// ─── Notifier impl (outbox) ──────────────────────────────────────────────────

impl Notifier for SqliteStore {
  async fn enqueue(&self, task: NotificationTask) -> Result<(), NotifyError> {
    let id = encode_uuid(Uuid::new_v4());
    let track_id = encode_uuid(task.track_id);
    let deadline = task.deadline_secs as i64;
    let ack = task.expected_ack as i64;
    let created_at = encode_dt(Utc::now());
    let payload = serde_json::to_string(&task)
      .map_err(|e| NotifyError::Rejected(e.to_string()))?;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO outbox
             (id, track_id, payload, deadline_secs, expected_ack, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![id, track_id, payload, deadline, ack, created_at],
        )?;
        Ok(())
      })
      .await
      .map_err(|e| NotifyError::Rejected(e.to_string()))
  }
}
