//! Pure history reconciliation.
//!
//! Carrier polls replay history: the same event can arrive many times, and
//! events can arrive out of chronological order. These functions fold a poll
//! batch into the existing timeline without side effects, so they are
//! directly unit-testable with explicit state.

use crate::status::{Fingerprint, LifecycleCode, StatusRecord};

/// The subset of `incoming` whose fingerprints are not yet in `current`.
/// Order-preserving; duplicates inside the batch itself are also dropped so
/// a history never holds two records with one fingerprint.
pub fn filter_new(
  current: &[StatusRecord],
  incoming: &[StatusRecord],
) -> Vec<StatusRecord> {
  let mut known: Vec<Fingerprint> =
    current.iter().map(StatusRecord::fingerprint).collect();

  let mut fresh = Vec::new();
  for status in incoming {
    let fp = status.fingerprint();
    if !known.contains(&fp) {
      known.push(fp);
      fresh.push(status.clone());
    }
  }
  fresh
}

/// Merge a poll batch into the existing timeline.
///
/// Without a `Returned` record the result is simply `current` plus the new
/// records in their incoming order: chronological disorder is tolerated and
/// insertion order is kept. Once a return event exists, the whole sequence
/// is sorted by timestamp and every record after the `Returned` one is
/// rewritten to `ReturningToSender` (same text and timestamp), except
/// `DeliveredToSender`, which is never rewritten and does not clear the
/// after-return state.
pub fn merge(
  current: &[StatusRecord],
  incoming: &[StatusRecord],
) -> Vec<StatusRecord> {
  let mut merged = current.to_vec();
  merged.extend(filter_new(current, incoming));

  if !merged.iter().any(|s| s.code() == LifecycleCode::Returned) {
    return merged;
  }

  // Stable sort: equal timestamps keep their relative order.
  merged.sort_by_key(StatusRecord::timestamp);

  let mut after_returned = false;
  for status in merged.iter_mut() {
    if after_returned && status.code() != LifecycleCode::DeliveredToSender {
      *status = status.with_code(LifecycleCode::ReturningToSender);
    }
    if status.code() == LifecycleCode::Returned {
      after_returned = true;
    }
  }

  merged
}

/// Sort a history for display and for the outbound payload: grouped by
/// canonical code order, ascending timestamp within each group.
pub fn canonical_sort(statuses: &[StatusRecord]) -> Vec<StatusRecord> {
  let mut sorted = statuses.to_vec();
  sorted.sort_by(|a, b| {
    a.code().cmp(&b.code()).then(a.timestamp().cmp(&b.timestamp()))
  });
  sorted
}
