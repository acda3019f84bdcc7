//! Event reminder bucketing.
//!
//! The reminder sweep runs on a coarse cadence (hourly in production),
//! so "send the 1-day reminder 24 hours before the event" cannot be a
//! point-in-time check: the sweep may fire at 23.4 or 24.9 hours out,
//! and a missed run must not silently skip a reminder.
//!
//! Instead, each sweep derives the *due bucket* purely from the time
//! remaining until the event. The buckets partition the final week
//! before an event into contiguous half-open windows, so every instant
//! inside that week maps to exactly one bucket, whichever sweep
//! observes it. Deduplication is the caller's job (one send per
//! event/bucket/recipient, tracked in a persistent ledger).

use chrono::{DateTime, Duration, Utc};

/// A reminder window, identified by how far ahead of the event it sits.
///
/// Windows are half-open on remaining time `r = start - now`:
///
/// | bucket     | window            |
/// |------------|-------------------|
/// | `SixHours` | 0 < r <= 7h       |
/// | `OneDay`   | 7h < r <= 25h     |
/// | `TwoDays`  | 25h < r <= 49h    |
/// | `ThreeDays`| 49h < r <= 73h    |
/// | `OneWeek`  | 73h < r <= 169h   |
///
/// Each upper bound carries one hour of slack over its nominal horizon
/// so an hourly sweep lands inside the window it advertises (an event
/// 24.5h away still gets the "1 day" reminder).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReminderBucket {
    SixHours,
    OneDay,
    TwoDays,
    ThreeDays,
    OneWeek,
}

impl ReminderBucket {
    /// All buckets, nearest horizon first.
    pub const ALL: [Self; 5] = [
        Self::SixHours,
        Self::OneDay,
        Self::TwoDays,
        Self::ThreeDays,
        Self::OneWeek,
    ];

    /// Human label, used in reminder mail and as the ledger key.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::SixHours => "6 hours",
            Self::OneDay => "1 day",
            Self::TwoDays => "2 days",
            Self::ThreeDays => "3 days",
            Self::OneWeek => "1 week",
        }
    }

    /// Upper bound of this bucket's window, in hours of remaining time.
    #[must_use]
    pub const fn upper_bound_hours(self) -> i64 {
        match self {
            Self::SixHours => 7,
            Self::OneDay => 25,
            Self::TwoDays => 49,
            Self::ThreeDays => 73,
            Self::OneWeek => 169,
        }
    }

    /// The bucket due for an event starting at `start`, observed at
    /// `now`.
    ///
    /// Returns `None` when the event has already started or is still
    /// more than a week (plus slack) away.
    #[must_use]
    pub fn due(now: DateTime<Utc>, start: DateTime<Utc>) -> Option<Self> {
        let remaining = start - now;
        if remaining <= Duration::zero() {
            return None;
        }
        Self::ALL
            .into_iter()
            .find(|bucket| remaining <= Duration::hours(bucket.upper_bound_hours()))
    }
}

impl std::fmt::Display for ReminderBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn at(base: DateTime<Utc>, minutes_ahead: i64) -> Option<ReminderBucket> {
        ReminderBucket::due(base, base + Duration::minutes(minutes_ahead))
    }

    fn base() -> DateTime<Utc> {
        "2025-06-01T12:00:00Z".parse().unwrap()
    }

    #[test]
    fn started_or_past_events_get_nothing() {
        assert_eq!(at(base(), 0), None);
        assert_eq!(at(base(), -90), None);
    }

    #[test]
    fn fractional_hours_fall_in_the_nearest_window() {
        // 6.2 hours out is a "6 hours" reminder, not a miss.
        assert_eq!(at(base(), 372), Some(ReminderBucket::SixHours));
        // 30 minutes out: still the last-call window.
        assert_eq!(at(base(), 30), Some(ReminderBucket::SixHours));
        // 24.5 hours out is the "1 day" reminder.
        assert_eq!(at(base(), 24 * 60 + 30), Some(ReminderBucket::OneDay));
    }

    #[test]
    fn window_boundaries_are_half_open() {
        assert_eq!(at(base(), 7 * 60), Some(ReminderBucket::SixHours));
        assert_eq!(at(base(), 7 * 60 + 1), Some(ReminderBucket::OneDay));
        assert_eq!(at(base(), 25 * 60), Some(ReminderBucket::OneDay));
        assert_eq!(at(base(), 25 * 60 + 1), Some(ReminderBucket::TwoDays));
        assert_eq!(at(base(), 49 * 60), Some(ReminderBucket::TwoDays));
        assert_eq!(at(base(), 73 * 60), Some(ReminderBucket::ThreeDays));
        assert_eq!(at(base(), 169 * 60), Some(ReminderBucket::OneWeek));
    }

    #[test]
    fn far_future_events_get_nothing_yet() {
        assert_eq!(at(base(), 169 * 60 + 1), None);
        assert_eq!(at(base(), 14 * 24 * 60), None);
    }

    #[test]
    fn every_instant_in_the_final_week_is_covered() {
        // Sampling every 10 minutes across the whole week: no gaps.
        for minutes in (10..=169 * 60).step_by(10) {
            assert!(
                at(base(), minutes).is_some(),
                "no bucket at {minutes} minutes"
            );
        }
    }

    #[test]
    fn labels_are_stable_ledger_keys() {
        assert_eq!(ReminderBucket::SixHours.label(), "6 hours");
        assert_eq!(ReminderBucket::OneWeek.label(), "1 week");
        assert_eq!(ReminderBucket::OneDay.to_string(), "1 day");
    }
}
