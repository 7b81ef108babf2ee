//! Status records — the fundamental unit of a track's timeline.
//!
//! A status record is an immutable claim by the carrier about a parcel at a
//! point in time. Records are never updated; a rewrite (e.g. relabelling a
//! post-return status) produces a new record.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{Error, Result};

// ─── Lifecycle codes ─────────────────────────────────────────────────────────

/// Shipment lifecycle codes, declared in canonical order.
///
/// The declaration order doubles as the priority used for grouping and
/// sorting (`Ord` derives from it). It is not chronological order: a carrier
/// may report an `Arrived` event timestamped before an `Accepted` one, and
/// the canonical order still governs how the two groups are presented.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleCode {
  Unregistered,
  Created,
  Registered,
  Accepted,
  Packed,
  InTransit,
  Arrived,
  OnDelivery,
  Pending,
  Delivered,
  Paid,
  Returned,
  ReturningToSender,
  DeliveredToSender,
}

impl LifecycleCode {
  /// Every code, in canonical order.
  pub const ALL: [LifecycleCode; 14] = [
    Self::Unregistered,
    Self::Created,
    Self::Registered,
    Self::Accepted,
    Self::Packed,
    Self::InTransit,
    Self::Arrived,
    Self::OnDelivery,
    Self::Pending,
    Self::Delivered,
    Self::Paid,
    Self::Returned,
    Self::ReturningToSender,
    Self::DeliveredToSender,
  ];

  /// The string form used on the wire and in storage.
  /// Must match the `rename_all = "snake_case"` serde tags above.
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Unregistered => "unregistered",
      Self::Created => "created",
      Self::Registered => "registered",
      Self::Accepted => "accepted",
      Self::Packed => "packed",
      Self::InTransit => "in_transit",
      Self::Arrived => "arrived",
      Self::OnDelivery => "on_delivery",
      Self::Pending => "pending",
      Self::Delivered => "delivered",
      Self::Paid => "paid",
      Self::Returned => "returned",
      Self::ReturningToSender => "returning_to_sender",
      Self::DeliveredToSender => "delivered_to_sender",
    }
  }

  /// Parse the storage/wire string form. The enumeration is closed; anything
  /// else is [`Error::UnknownCode`].
  pub fn parse(s: &str) -> Result<Self> {
    Self::ALL
      .into_iter()
      .find(|code| code.as_str() == s)
      .ok_or_else(|| Error::UnknownCode(s.to_owned()))
  }
}

impl fmt::Display for LifecycleCode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

// ─── Fingerprint ─────────────────────────────────────────────────────────────

/// Deterministic identity of a status event.
///
/// Two records with equal fingerprints are the same event, however many polls
/// reported it. Stable across process restarts and across implementations:
/// SHA-256 over the code string, text, and unix-second timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
  /// Wrap a previously computed hex digest read back from storage.
  pub fn from_hex(hex: impl Into<String>) -> Self { Self(hex.into()) }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for Fingerprint {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

// ─── StatusRecord ────────────────────────────────────────────────────────────

/// Maximum length of a carrier-supplied status text, in characters.
pub const MAX_TEXT_LEN: usize = 250;

/// One carrier-reported lifecycle event. Immutable once constructed.
///
/// Only [`Serialize`] is derived: every record enters the system through
/// [`StatusRecord::new`] so the text-length bound is enforced exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusRecord {
  code:      LifecycleCode,
  text:      String,
  timestamp: DateTime<Utc>,
}

impl StatusRecord {
  /// Build a record, rejecting over-long text before it can enter a history.
  pub fn new(
    code: LifecycleCode,
    text: impl Into<String>,
    timestamp: DateTime<Utc>,
  ) -> Result<Self> {
    let text = text.into();
    let len = text.chars().count();
    if len > MAX_TEXT_LEN {
      return Err(Error::TextTooLong(len));
    }
    Ok(Self { code, text, timestamp })
  }

  pub fn code(&self) -> LifecycleCode { self.code }

  pub fn text(&self) -> &str { &self.text }

  pub fn timestamp(&self) -> DateTime<Utc> { self.timestamp }

  /// A copy of this record under a different code, same text and timestamp.
  /// Used by the return-rewrite pass and the selector's return tail.
  pub(crate) fn with_code(&self, code: LifecycleCode) -> Self {
    Self {
      code,
      text: self.text.clone(),
      timestamp: self.timestamp,
    }
  }

  /// Content fingerprint over `(code, text, timestamp)`.
  pub fn fingerprint(&self) -> Fingerprint {
    let mut hasher = Sha256::new();
    hasher.update(self.code.as_str().as_bytes());
    hasher.update([0u8]);
    hasher.update(self.text.as_bytes());
    hasher.update([0u8]);
    hasher.update(self.timestamp.timestamp().to_le_bytes());
    Fingerprint(hex::encode(hasher.finalize()))
  }
}
