//! The outbound notification boundary.
//!
//! The core never delivers anything itself. It hands a [`NotificationTask`]
//! to a [`Notifier`], which must queue it durably for at-least-once delivery;
//! retry and backoff live entirely on the other side of this trait.

use std::future::Future;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::status::StatusRecord;

/// How long the delivery collaborator may keep retrying a task.
pub const DELIVERY_DEADLINE_SECS: u64 = 24 * 60 * 60;

/// HTTP status the downstream consumer answers with to acknowledge a task.
pub const EXPECTED_ACK_STATUS: u16 = 202;

// ─── Auxiliary context ───────────────────────────────────────────────────────

/// Origin/destination office details attached to outbound notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfficeInfo {
  pub address: Option<String>,
  #[serde(default)]
  pub phones:  Vec<String>,
}

// ─── Task ────────────────────────────────────────────────────────────────────

/// One durable outbound notification: a parcel's identity, its full
/// canonically sorted history, and the single record being notified.
#[derive(Debug, Clone, Serialize)]
pub struct NotificationTask {
  pub track_id:      Uuid,
  pub order_id:      String,
  /// The whole timeline in canonical order, for consumers that want context.
  pub statuses:      Vec<StatusRecord>,
  /// The record this notification is about.
  pub status:        StatusRecord,
  pub office:        Option<OfficeInfo>,
  pub deadline_secs: u64,
  pub expected_ack:  u16,
}

// ─── Errors ──────────────────────────────────────────────────────────────────

/// Failures of the notification pipeline. Both leave the track's notified
/// set untouched, so the same selection is retried on the next poll.
#[derive(Debug, Error)]
pub enum NotifyError {
  /// The owning plugin has no live registration to deliver through.
  #[error("plugin is not registered; cannot deliver notifications")]
  NotRegistered,

  #[error("notification task rejected: {0}")]
  Rejected(String),
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Durable handoff of a notification decision.
///
/// `enqueue` returning `Ok` means the task will eventually be delivered
/// (at least once); an accepted task must never be dropped. Implemented by
/// storage backends as an outbox table.
pub trait Notifier: Send + Sync {
  fn enqueue(
    &self,
    task: NotificationTask,
  ) -> impl Future<Output = Result<(), NotifyError>> + Send + '_;
}
