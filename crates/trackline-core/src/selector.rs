//! Notification selection — decides the single status to push next.
//!
//! A fixed-precedence state machine: each step looks for the most recent
//! record of one decisive code and short-circuits. If that record has not
//! been notified yet it is the answer; if it has, the step either ends the
//! whole track (terminal codes) or falls through to the next step. Only when
//! no decisive code is present does the most recent record overall win.

use crate::status::{Fingerprint, LifecycleCode, StatusRecord};

/// Pick at most one record to notify, or `None`.
///
/// Never returns a record whose fingerprint is already in `notified`, and is
/// idempotent for an unchanged `(statuses, notified)` pair. `is_cod` switches
/// the terminal delivery code between `Paid` (collect-on-delivery) and
/// `Delivered`.
pub fn next_to_notify(
  statuses: &[StatusRecord],
  notified: &[Fingerprint],
  is_cod: bool,
) -> Option<StatusRecord> {
  let sent =
    |status: &StatusRecord| notified.contains(&status.fingerprint());

  // A deleted or lost shipment trumps everything. Once it has been sent,
  // nothing else is ever notified for this track.
  match latest(statuses, Some(LifecycleCode::Unregistered)) {
    Some(s) if !sent(&s) => return Some(s),
    Some(_) => return None,
    None => {}
  }

  // The terminal delivery code depends on the payment mode.
  let terminal = if is_cod {
    LifecycleCode::Paid
  } else {
    LifecycleCode::Delivered
  };
  match latest(statuses, Some(terminal)) {
    Some(s) if !sent(&s) => return Some(s),
    Some(_) => return None,
    None => {}
  }

  // After a return has been reported only the return tail can follow: the
  // final delivered-to-sender event, or later records relabelled as
  // returning-to-sender with their original text and timestamp.
  if let Some(returned) = latest(statuses, Some(LifecycleCode::Returned)) {
    if !sent(&returned) {
      return Some(returned);
    }

    match latest(statuses, Some(LifecycleCode::DeliveredToSender)) {
      Some(s) if !sent(&s) => return Some(s),
      Some(_) => return None,
      None => {}
    }

    if let Some(last) = latest(statuses, None)
      && last.fingerprint() != returned.fingerprint()
    {
      let rewritten = last.with_code(LifecycleCode::ReturningToSender);
      if !sent(&rewritten) {
        return Some(rewritten);
      }
    }
    return None;
  }

  for code in [
    LifecycleCode::Arrived,
    LifecycleCode::Accepted,
    LifecycleCode::InTransit,
  ] {
    match latest(statuses, Some(code)) {
      Some(s) if !sent(&s) => return Some(s),
      Some(_) => return None,
      None => {}
    }
  }

  // Nothing decisive; fall back to the most recent record overall.
  latest(statuses, None).filter(|s| !sent(s))
}

/// The most recent record, optionally restricted to one code.
fn latest(
  statuses: &[StatusRecord],
  code: Option<LifecycleCode>,
) -> Option<StatusRecord> {
  statuses
    .iter()
    .filter(|s| code.is_none_or(|c| s.code() == c))
    .max_by_key(|s| s.timestamp())
    .cloned()
}

#[cfg(test)]
mod tests {
  use chrono::{DateTime, TimeZone, Utc};

  use super::*;
  use crate::{history, status::LifecycleCode::*};

  fn at(secs: i64) -> DateTime<Utc> { Utc.timestamp_opt(secs, 0).unwrap() }

  fn rec(code: LifecycleCode, text: &str, secs: i64) -> StatusRecord {
    StatusRecord::new(code, text, at(secs)).unwrap()
  }

  fn fps(records: &[StatusRecord]) -> Vec<Fingerprint> {
    records.iter().map(StatusRecord::fingerprint).collect()
  }

  #[test]
  fn empty_history_selects_nothing() {
    assert_eq!(next_to_notify(&[], &[], false), None);
  }

  #[test]
  fn unregistered_short_circuits_everything() {
    let statuses =
      vec![rec(Unregistered, "", 1), rec(Returned, "", 2)];

    let selected = next_to_notify(&statuses, &[], true).unwrap();
    assert_eq!(selected.code(), Unregistered);

    // Once sent, the track is silent forever, returns notwithstanding.
    let notified = fps(&[selected]);
    assert_eq!(next_to_notify(&statuses, &notified, true), None);
  }

  #[test]
  fn terminal_code_depends_on_payment_mode() {
    let statuses = vec![
      rec(Created, "", 1),
      rec(InTransit, "", 2),
      rec(Arrived, "", 3),
      rec(Delivered, "", 4),
      rec(Paid, "", 5),
    ];

    let cod = next_to_notify(&statuses, &[], true).unwrap();
    assert_eq!(cod.code(), Paid);
    assert_eq!(next_to_notify(&statuses, &fps(&[cod]), true), None);

    let plain = next_to_notify(&statuses, &[], false).unwrap();
    assert_eq!(plain.code(), Delivered);
    assert_eq!(next_to_notify(&statuses, &fps(&[plain]), false), None);
  }

  #[test]
  fn delivered_then_none_once_notified() {
    let statuses = vec![rec(Delivered, "handed over", 10)];

    let selected = next_to_notify(&statuses, &[], false).unwrap();
    assert_eq!(selected, rec(Delivered, "handed over", 10));
    assert_eq!(next_to_notify(&statuses, &fps(&[selected]), false), None);
  }

  #[test]
  fn returned_then_rewritten_tail() {
    let mut statuses =
      vec![rec(InTransit, "moving", 1), rec(Returned, "refused", 2)];

    let returned = next_to_notify(&statuses, &[], false).unwrap();
    assert_eq!(returned.code(), Returned);
    let mut notified = fps(&[returned]);

    // A later record merges in rewritten; the selector reports it under its
    // rewritten identity with the original text preserved.
    statuses =
      history::merge(&statuses, &[rec(InTransit, "heading back", 3)]);
    let tail = next_to_notify(&statuses, &notified, false).unwrap();
    assert_eq!(tail.code(), ReturningToSender);
    assert_eq!(tail.text(), "heading back");
    assert_eq!(tail.timestamp(), at(3));

    notified.push(tail.fingerprint());
    assert_eq!(next_to_notify(&statuses, &notified, false), None);
  }

  #[test]
  fn delivered_to_sender_closes_the_return_tail() {
    let statuses = vec![
      rec(InTransit, "", 1),
      rec(Returned, "RETURNED", 2),
      rec(ReturningToSender, "RETURNED IN_TRANSIT", 3),
      rec(DeliveredToSender, "DELIVERED_TO_SENDER", 4),
    ];
    let notified = fps(&statuses[..3]);

    let selected = next_to_notify(&statuses, &notified, false).unwrap();
    assert_eq!(selected.code(), DeliveredToSender);

    let mut notified = notified;
    notified.push(selected.fingerprint());
    assert_eq!(next_to_notify(&statuses, &notified, false), None);
  }

  #[test]
  fn returned_with_no_later_record_selects_nothing_more() {
    let statuses = vec![rec(InTransit, "", 1), rec(Returned, "", 5)];
    let notified = fps(&statuses);
    // The most recent record overall *is* the returned one; no tail yet.
    assert_eq!(next_to_notify(&statuses, &notified, false), None);
  }

  #[test]
  fn progress_ladder_prefers_arrived_over_accepted_and_in_transit() {
    let statuses = vec![
      rec(Accepted, "", 1),
      rec(InTransit, "", 2),
      rec(Arrived, "", 3),
    ];
    let selected = next_to_notify(&statuses, &[], false).unwrap();
    assert_eq!(selected.code(), Arrived);

    // Arrived already sent: the ladder stops rather than regressing.
    assert_eq!(next_to_notify(&statuses, &fps(&[selected]), false), None);
  }

  #[test]
  fn fallback_picks_most_recent_record() {
    let statuses = vec![rec(Created, "", 1), rec(Packed, "", 7)];
    let selected = next_to_notify(&statuses, &[], false).unwrap();
    assert_eq!(selected, rec(Packed, "", 7));

    assert_eq!(next_to_notify(&statuses, &fps(&[selected]), false), None);
  }

  #[test]
  fn at_most_one_and_never_a_notified_fingerprint() {
    let statuses = vec![
      rec(InTransit, "", 1),
      rec(Arrived, "", 2),
      rec(Delivered, "", 3),
    ];

    // Drain the selector; every pick must be fresh and the sequence finite.
    let mut notified = Vec::new();
    let mut picks = Vec::new();
    while let Some(s) = next_to_notify(&statuses, &notified, false) {
      assert!(!notified.contains(&s.fingerprint()));
      notified.push(s.fingerprint());
      picks.push(s);
      assert!(picks.len() <= statuses.len());
    }
    assert!(!picks.is_empty());
  }
}
