//! SQL schema for the Trackline SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS tracks (
    id             TEXT PRIMARY KEY,
    company_id     TEXT NOT NULL,
    plugin_alias   TEXT NOT NULL,
    plugin_id      TEXT NOT NULL,
    number         TEXT NOT NULL,   -- carrier tracking number
    shipping_id    TEXT NOT NULL,
    order_id       TEXT NOT NULL,
    is_cod         INTEGER NOT NULL,
    created_at     TEXT NOT NULL,   -- ISO 8601 UTC
    next_poll_at   TEXT,
    last_polled_at TEXT,
    stopped_at     TEXT,
    notified_at    TEXT,
    shard          TEXT NOT NULL,   -- single hex digit
    office         TEXT,            -- JSON OfficeInfo or NULL
    statuses       TEXT NOT NULL DEFAULT '[]',  -- JSON array, order preserved
    notified       TEXT NOT NULL DEFAULT '[]'   -- JSON array of fingerprints
);

CREATE INDEX IF NOT EXISTS tracks_due_idx
  ON tracks(created_at, next_poll_at, stopped_at, shard);
CREATE INDEX IF NOT EXISTS tracks_last_polled_idx ON tracks(last_polled_at);
CREATE INDEX IF NOT EXISTS tracks_number_idx      ON tracks(number);

-- Durable notification outbox. Rows are append-only from the store's side;
-- the external delivery worker consumes and deletes them.
CREATE TABLE IF NOT EXISTS outbox (
    id            TEXT PRIMARY KEY,
    track_id      TEXT NOT NULL,
    payload       TEXT NOT NULL,   -- JSON NotificationTask
    deadline_secs INTEGER NOT NULL,
    expected_ack  INTEGER NOT NULL,
    created_at    TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS outbox_created_idx ON outbox(created_at);

PRAGMA user_version = 1;
";
