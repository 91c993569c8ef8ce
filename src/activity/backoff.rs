//! Adaptive backoff policy mapping quiet time to a revalidation interval.
//!
//! A policy is an ordered list of [`BackoffTier`]s. Tiers are evaluated in
//! ascending order and the first tier whose upper bound exceeds the time
//! since the last content change wins. The final tier has no upper bound
//! and catches every remaining duration.
//!
//! ```text
//!  time since last change ──────────────────────────────────────────▶
//!  │ < 30 min          │ < 2 h                 │ unbounded
//!  │ 5 min             │ 30 min                │ 1 h (cap)
//!  │ recent activity   │ moderate quiet period │ quiet period - backing off
//! ```

use std::time::Duration;

use crate::error::{Result, RevalidatorError};

/// Reason label for the shortest default tier.
pub const REASON_RECENT_ACTIVITY: &str = "recent activity";

/// Reason label for the middle default tier.
pub const REASON_MODERATE_QUIET: &str = "moderate quiet period";

/// Reason label for the final, capped default tier.
pub const REASON_QUIET_BACKOFF: &str = "quiet period - backing off";

/// One bracket of elapsed quiet time mapped to a target interval.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackoffTier {
    /// Exclusive upper bound on time since last change; `None` for the
    /// catch-all tier.
    pub upper_bound: Option<Duration>,

    /// Recommended wait before the next revalidation check.
    pub interval: Duration,

    /// Human-readable label reported as the status `reason`.
    pub reason: String,
}

impl BackoffTier {
    /// Creates a tier that applies while quiet time is below `upper_bound`.
    pub fn bounded(upper_bound: Duration, interval: Duration, reason: impl Into<String>) -> Self {
        Self {
            upper_bound: Some(upper_bound),
            interval,
            reason: reason.into(),
        }
    }

    /// Creates the catch-all tier.
    pub fn unbounded(interval: Duration, reason: impl Into<String>) -> Self {
        Self {
            upper_bound: None,
            interval,
            reason: reason.into(),
        }
    }

    fn covers(&self, elapsed: Duration) -> bool {
        self.upper_bound.is_none_or(|bound| elapsed < bound)
    }
}

/// Ordered tiers plus an absolute interval cap.
///
/// # Example
/// ```rust
/// use std::time::Duration;
/// use revalidator::BackoffPolicy;
///
/// let policy = BackoffPolicy::default();
/// let (interval, reason) = policy.interval_for(Duration::from_secs(10 * 60));
/// assert_eq!(interval, Duration::from_secs(300));
/// assert_eq!(reason, "recent activity");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Tiers in ascending order of upper bound.
    pub tiers: Vec<BackoffTier>,

    /// No recommended interval ever exceeds this value.
    pub max_interval: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            tiers: vec![
                BackoffTier::bounded(
                    Duration::from_secs(30 * 60),
                    Duration::from_secs(5 * 60),
                    REASON_RECENT_ACTIVITY,
                ),
                BackoffTier::bounded(
                    Duration::from_secs(2 * 60 * 60),
                    Duration::from_secs(30 * 60),
                    REASON_MODERATE_QUIET,
                ),
                BackoffTier::unbounded(Duration::from_secs(60 * 60), REASON_QUIET_BACKOFF),
            ],
            max_interval: Duration::from_secs(60 * 60),
        }
    }
}

impl BackoffPolicy {
    /// Validates tier ordering and interval bounds.
    ///
    /// # Errors
    /// Returns `RevalidatorError::Config` if:
    /// - there are no tiers, or the last tier is bounded
    /// - any tier other than the last is unbounded
    /// - bounded upper limits are not strictly ascending
    /// - any interval (or the cap) is zero
    /// - intervals decrease from one tier to the next
    pub fn validate(&self) -> Result<()> {
        let Some(last) = self.tiers.last() else {
            return Err(RevalidatorError::config("backoff policy needs at least one tier"));
        };
        if last.upper_bound.is_some() {
            return Err(RevalidatorError::config(
                "last backoff tier must be unbounded",
            ));
        }
        if self.max_interval.is_zero() {
            return Err(RevalidatorError::config("max_interval must be greater than 0"));
        }

        let mut previous: Option<&BackoffTier> = None;
        for (idx, tier) in self.tiers.iter().enumerate() {
            if tier.interval.is_zero() {
                return Err(RevalidatorError::config(format!(
                    "tier {idx} interval must be greater than 0"
                )));
            }
            if idx + 1 < self.tiers.len() && tier.upper_bound.is_none() {
                return Err(RevalidatorError::config(format!(
                    "only the last tier may be unbounded (tier {idx})"
                )));
            }
            if let Some(prev) = previous {
                if let (Some(prev_bound), Some(bound)) = (prev.upper_bound, tier.upper_bound) {
                    if bound <= prev_bound {
                        return Err(RevalidatorError::config(format!(
                            "tier {idx} upper bound must exceed tier {}",
                            idx - 1
                        )));
                    }
                }
                if tier.interval < prev.interval {
                    return Err(RevalidatorError::config(format!(
                        "tier {idx} interval must not be shorter than tier {}",
                        idx - 1
                    )));
                }
            }
            previous = Some(tier);
        }

        Ok(())
    }

    /// Returns the tier that applies to `elapsed` quiet time.
    ///
    /// Falls back to the last tier if no bound covers `elapsed` (only
    /// possible for an unvalidated policy). Returns `None` for an empty
    /// policy.
    pub fn select(&self, elapsed: Duration) -> Option<&BackoffTier> {
        self.tiers
            .iter()
            .find(|tier| tier.covers(elapsed))
            .or_else(|| self.tiers.last())
    }

    /// Returns the capped interval and reason label for `elapsed`.
    pub fn interval_for(&self, elapsed: Duration) -> (Duration, &str) {
        match self.select(elapsed) {
            Some(tier) => (tier.interval.min(self.max_interval), tier.reason.as_str()),
            None => (self.max_interval, REASON_QUIET_BACKOFF),
        }
    }

    /// Returns the interval of the first tier, capped.
    pub fn shortest_interval(&self) -> Duration {
        self.tiers
            .first()
            .map(|tier| tier.interval.min(self.max_interval))
            .unwrap_or(self.max_interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIN: Duration = Duration::from_secs(60);

    fn two_tier() -> BackoffPolicy {
        BackoffPolicy {
            tiers: vec![
                BackoffTier::bounded(MIN * 10, MIN, "fast"),
                BackoffTier::unbounded(MIN * 20, "slow"),
            ],
            max_interval: MIN * 15,
        }
    }

    #[test]
    fn test_default_policy_is_valid() {
        assert!(BackoffPolicy::default().validate().is_ok());
    }

    #[test]
    fn test_default_tiers() {
        let policy = BackoffPolicy::default();
        assert_eq!(
            policy.interval_for(MIN * 10),
            (MIN * 5, REASON_RECENT_ACTIVITY)
        );
        assert_eq!(
            policy.interval_for(MIN * 45),
            (MIN * 30, REASON_MODERATE_QUIET)
        );
        assert_eq!(
            policy.interval_for(MIN * 180),
            (MIN * 60, REASON_QUIET_BACKOFF)
        );
    }

    #[test]
    fn test_bound_is_exclusive() {
        let policy = two_tier();
        assert_eq!(policy.select(MIN * 10 - Duration::from_millis(1)).unwrap().reason, "fast");
        assert_eq!(policy.select(MIN * 10).unwrap().reason, "slow");
    }

    #[test]
    fn test_cap_applies() {
        let policy = two_tier();
        assert_eq!(policy.interval_for(MIN * 60), (MIN * 15, "slow"));
    }

    #[test]
    fn test_shortest_interval() {
        assert_eq!(two_tier().shortest_interval(), MIN);
        assert_eq!(BackoffPolicy::default().shortest_interval(), MIN * 5);
    }

    #[test]
    fn test_empty_policy() {
        let policy = BackoffPolicy {
            tiers: Vec::new(),
            max_interval: MIN,
        };
        assert!(policy.select(MIN).is_none());
        assert_eq!(policy.interval_for(MIN), (MIN, REASON_QUIET_BACKOFF));
        assert!(policy.validate().unwrap_err().is_config());
    }

    #[test]
    fn test_validate_rejects_bounded_last_tier() {
        let policy = BackoffPolicy {
            tiers: vec![BackoffTier::bounded(MIN, MIN, "only")],
            max_interval: MIN,
        };
        let err = policy.validate().unwrap_err();
        assert!(err.to_string().contains("unbounded"));
    }

    #[test]
    fn test_validate_rejects_unbounded_middle_tier() {
        let policy = BackoffPolicy {
            tiers: vec![
                BackoffTier::unbounded(MIN, "a"),
                BackoffTier::unbounded(MIN, "b"),
            ],
            max_interval: MIN,
        };
        assert!(policy.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_unsorted_bounds() {
        let policy = BackoffPolicy {
            tiers: vec![
                BackoffTier::bounded(MIN * 10, MIN, "a"),
                BackoffTier::bounded(MIN * 5, MIN * 2, "b"),
                BackoffTier::unbounded(MIN * 3, "c"),
            ],
            max_interval: MIN * 3,
        };
        let err = policy.validate().unwrap_err();
        assert!(err.to_string().contains("upper bound"));
    }

    #[test]
    fn test_validate_rejects_decreasing_interval() {
        let policy = BackoffPolicy {
            tiers: vec![
                BackoffTier::bounded(MIN * 10, MIN * 5, "a"),
                BackoffTier::unbounded(MIN, "b"),
            ],
            max_interval: MIN * 5,
        };
        let err = policy.validate().unwrap_err();
        assert!(err.to_string().contains("shorter"));
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let zero_interval = BackoffPolicy {
            tiers: vec![BackoffTier::unbounded(Duration::ZERO, "a")],
            max_interval: MIN,
        };
        assert!(zero_interval.validate().is_err());

        let zero_cap = BackoffPolicy {
            tiers: vec![BackoffTier::unbounded(MIN, "a")],
            max_interval: Duration::ZERO,
        };
        assert!(zero_cap.validate().is_err());
    }

    #[test]
    fn test_interval_non_decreasing_over_time() {
        let policy = BackoffPolicy::default();
        let mut last = Duration::ZERO;
        for minutes in 0..600 {
            let (interval, _) = policy.interval_for(MIN * minutes);
            assert!(interval >= last, "interval dropped at {minutes} min");
            last = interval;
        }
    }
}
