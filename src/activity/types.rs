//! Data types for revalidation activity tracking.
//!
//! [`ActivityState`] is the single piece of mutable state the manager owns.
//! [`ActivityStatus`] is derived from it on every query and never stored.

use std::time::Duration;

use serde::Serialize;

use crate::types::{Fingerprint, Timestamp};

/// Last-known change activity of the monitored content set.
///
/// # Invariants
///
/// `last_change <= last_check`, and both never move backwards. The
/// manager only mutates this struct while holding its lock.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActivityState {
    /// When the content was last observed to differ from the previous check.
    pub last_change: Timestamp,

    /// When the content source was last queried successfully.
    pub last_check: Timestamp,

    /// Fingerprint from the last successful check; `None` until the first one.
    pub cached_fingerprint: Option<Fingerprint>,

    /// Interval reported by the most recent status, reused when a check
    /// fails and the manager falls back to cached state.
    pub last_interval: Duration,
}

impl ActivityState {
    /// Creates the process-start state: both timestamps at `started_at`,
    /// no fingerprint yet.
    pub fn new(started_at: Timestamp, initial_interval: Duration) -> Self {
        Self {
            last_change: started_at,
            last_check: started_at,
            cached_fingerprint: None,
            last_interval: initial_interval,
        }
    }

    /// Returns true if `last_change <= last_check <= now`.
    pub fn is_consistent_at(&self, now: Timestamp) -> bool {
        self.last_change <= self.last_check && self.last_check <= now
    }
}

/// Revalidation recommendation derived from [`ActivityState`].
///
/// Serializes with the camelCase field names the status endpoint uses;
/// durations are rendered as milliseconds (`timeSinceLastChange`) and
/// seconds (`nextInterval`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityStatus {
    /// True if the check backing this status found a change.
    pub has_changes: bool,

    /// Time elapsed since the content last changed.
    #[serde(serialize_with = "serialize_millis")]
    pub time_since_last_change: Duration,

    /// Recommended wait before the next revalidation check.
    #[serde(serialize_with = "serialize_secs")]
    pub next_interval: Duration,

    /// Why `next_interval` was chosen.
    pub reason: String,
}

impl ActivityStatus {
    /// `time_since_last_change` in hours, as a float.
    pub fn hours_since_last_change(&self) -> f64 {
        self.time_since_last_change.as_millis() as f64 / 3_600_000.0
    }

    /// `next_interval` in minutes, as a float.
    pub fn next_interval_minutes(&self) -> f64 {
        self.next_interval.as_secs() as f64 / 60.0
    }
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

fn serialize_secs<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_secs())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_is_consistent() {
        let t0 = Timestamp::from_millis(5_000);
        let state = ActivityState::new(t0, Duration::from_secs(300));
        assert_eq!(state.last_change, t0);
        assert_eq!(state.last_check, t0);
        assert!(state.cached_fingerprint.is_none());
        assert!(state.is_consistent_at(t0));
        assert!(!state.is_consistent_at(Timestamp::from_millis(4_999)));
    }

    #[test]
    fn test_status_serializes_camel_case() {
        let status = ActivityStatus {
            has_changes: true,
            time_since_last_change: Duration::from_millis(1_500),
            next_interval: Duration::from_secs(300),
            reason: "recent activity".to_string(),
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["hasChanges"], true);
        assert_eq!(json["timeSinceLastChange"], 1_500);
        assert_eq!(json["nextInterval"], 300);
        assert_eq!(json["reason"], "recent activity");
    }

    #[test]
    fn test_unit_conversions() {
        let status = ActivityStatus {
            has_changes: false,
            time_since_last_change: Duration::from_secs(90 * 60),
            next_interval: Duration::from_secs(90),
            reason: String::new(),
        };
        assert!((status.hours_since_last_change() - 1.5).abs() < f64::EPSILON);
        assert!((status.next_interval_minutes() - 1.5).abs() < f64::EPSILON);
    }
}
