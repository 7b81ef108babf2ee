//! Poll scheduling rules.
//!
//! A scheduling pass asks the store for tracks satisfying [`is_due`]; store
//! backends reproduce the same predicate in their query (see
//! `trackline-store-sqlite`), so the function here is the reference
//! definition and the thing the tests pin down.

use chrono::{DateTime, Duration, Utc};

use crate::track::Track;

/// Tracks older than this age out of the scheduler entirely (5 months).
pub const TRACKING_WINDOW_DAYS: i64 = 150;

/// Minimum spacing between two polls of the same track.
pub const POLL_SPACING_MINUTES: i64 = 60;

/// Default cap on the number of tracks returned per scheduling pass.
pub const DEFAULT_LIMIT: usize = 3000;

/// Whether `track` should be handed to the poll adapter at `now`.
pub fn is_due(track: &Track, now: DateTime<Utc>) -> bool {
  if track.created_at < now - Duration::days(TRACKING_WINDOW_DAYS) {
    return false;
  }
  if track.stopped_at.is_some() {
    return false;
  }
  if track.next_poll_at.is_some_and(|at| at > now) {
    return false;
  }
  if track
    .last_polled_at
    .is_some_and(|at| at > now - Duration::minutes(POLL_SPACING_MINUTES))
  {
    return false;
  }
  true
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::track::OwnerRef;

  fn track() -> Track {
    Track::new(
      OwnerRef {
        company_id:   "1".into(),
        plugin_alias: "carrier".into(),
        plugin_id:    "1".into(),
      },
      "RR123456785RU",
      "shipping-1",
      "order-1",
      false,
    )
  }

  #[test]
  fn fresh_track_is_due() {
    let track = track();
    assert!(is_due(&track, Utc::now()));
  }

  #[test]
  fn six_month_old_track_is_never_due() {
    let mut track = track();
    track.created_at = Utc::now() - Duration::days(30 * 6);
    assert!(!is_due(&track, Utc::now()));
  }

  #[test]
  fn stopped_track_is_skipped() {
    let mut track = track();
    track.stop();
    assert!(!is_due(&track, Utc::now()));
  }

  #[test]
  fn next_poll_at_defers_until_reached() {
    let mut track = track();
    track.set_next_poll_in(30);
    let now = Utc::now();
    assert!(!is_due(&track, now));
    assert!(is_due(&track, now + Duration::minutes(31)));
  }

  #[test]
  fn recent_poll_enforces_hourly_spacing() {
    let mut track = track();
    track.set_last_polled();
    let now = Utc::now();
    assert!(!is_due(&track, now));
    assert!(is_due(&track, now + Duration::minutes(POLL_SPACING_MINUTES + 1)));
  }
}
