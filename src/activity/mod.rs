//! Revalidation activity tracking module.
//!
//! The [`ActivityManager`] remembers when the monitored content last
//! changed and turns the quiet time since then into a recommended
//! revalidation interval via a [`BackoffPolicy`].
//!
//! # Operations
//!
//! - [`get_activity_status()`](ActivityManager::get_activity_status) — lazy,
//!   threshold-gated check; never fails because of the content source
//! - [`force_refresh()`](ActivityManager::force_refresh) — unconditional
//!   check; reports content-source failures to the caller
//! - [`snapshot()`](ActivityManager::snapshot) — consistent copy of the state
//!
//! Both checking paths run through one routine parameterized by `force`.
//!
//! # Concurrency
//!
//! State lives behind an async mutex that is held across the whole
//! fetch-compare-update sequence, so concurrent callers observe either the
//! state before a check or after it, never in between. The fetch itself is
//! bounded by `Config::fetch_timeout`.
//!
//! A failed fetch is remembered for one re-check threshold. Lazy callers
//! that queue behind a hung source answer from cached state instead of
//! each paying the full timeout again; forced refreshes always fetch.

pub mod backoff;
pub mod types;

pub use backoff::{
    BackoffPolicy, BackoffTier, REASON_MODERATE_QUIET, REASON_QUIET_BACKOFF,
    REASON_RECENT_ACTIVITY,
};
pub use types::{ActivityState, ActivityStatus};

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::error::{ContentSourceError, Result, RevalidatorError};
use crate::source::ContentSource;
use crate::types::{Fingerprint, Timestamp};

/// Reason reported by [`ActivityManager::force_refresh`].
pub const REASON_FORCED_REFRESH: &str = "forced refresh";

/// Reason reported when a lazy check fails and cached state is used.
pub const REASON_CHECK_FAILED: &str = "check failed, using cached state";

/// Owner of the activity state for one monitored content set.
///
/// Construct one per process (or per test) and share it with request
/// handlers through an `Arc`.
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use revalidator::{ActivityManager, Config, DirectorySource};
///
/// let source = Arc::new(DirectorySource::new("content/blog"));
/// let manager = ActivityManager::new(Config::default(), source)?;
///
/// let status = manager.get_activity_status().await?;
/// println!("revalidate again in {}s ({})", status.next_interval.as_secs(), status.reason);
/// ```
pub struct ActivityManager {
    config: Config,
    source: Arc<dyn ContentSource>,
    clock: Arc<dyn Clock>,
    inner: Mutex<Tracked>,
}

/// Everything guarded by the manager lock.
#[derive(Debug)]
struct Tracked {
    state: ActivityState,
    /// When the last fetch failed; cleared by the next successful one.
    failed_at: Option<Timestamp>,
}

impl std::fmt::Debug for ActivityManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivityManager")
            .field("config", &self.config)
            .field("source", &self.source.name())
            .finish_non_exhaustive()
    }
}

impl ActivityManager {
    /// Creates a manager reading the system clock.
    ///
    /// # Errors
    ///
    /// Returns `RevalidatorError::Config` if `config` is invalid
    /// (see [`Config::validate`]).
    pub fn new(config: Config, source: Arc<dyn ContentSource>) -> Result<Self> {
        Self::with_clock(config, source, Arc::new(SystemClock))
    }

    /// Creates a manager reading time from `clock`.
    ///
    /// The state starts with both timestamps at the clock's current time
    /// and no cached fingerprint, so the first status query always checks
    /// the source.
    #[instrument(skip_all, fields(source = source.name()))]
    pub fn with_clock(
        config: Config,
        source: Arc<dyn ContentSource>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;

        let started_at = clock.now();
        let state = ActivityState::new(started_at, config.backoff.shortest_interval());

        info!(
            recheck_ms = config.recheck_threshold.as_millis() as u64,
            timeout_ms = config.fetch_timeout.as_millis() as u64,
            tiers = config.backoff.tiers.len(),
            "Activity manager initialised"
        );

        Ok(Self {
            config,
            source,
            clock,
            inner: Mutex::new(Tracked {
                state,
                failed_at: None,
            }),
        })
    }

    /// Returns the configuration this manager was built with.
    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the name of the monitored content source.
    #[inline]
    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    /// Returns a consistent copy of the current state.
    pub async fn snapshot(&self) -> ActivityState {
        self.inner.lock().await.state.clone()
    }

    /// Returns the current revalidation recommendation.
    ///
    /// Queries the content source only if the re-check threshold has
    /// elapsed since the last successful check (or no check has happened
    /// yet); otherwise answers from cached state with `has_changes = false`.
    ///
    /// A failing or timed-out source does not fail this call: the previous
    /// interval is reported with reason [`REASON_CHECK_FAILED`] and the
    /// state is left untouched. Until one re-check threshold has passed
    /// since that failure, further calls report the same fallback without
    /// querying the source.
    ///
    /// # Errors
    ///
    /// Returns `RevalidatorError::InternalState` only if the state ordering
    /// invariant is found broken.
    #[instrument(skip(self), fields(source = self.source.name()))]
    pub async fn get_activity_status(&self) -> Result<ActivityStatus> {
        self.perform_check(false).await
    }

    /// Re-reads the content fingerprint regardless of the threshold.
    ///
    /// On success the returned status carries reason
    /// [`REASON_FORCED_REFRESH`] and `has_changes` tells whether the
    /// fingerprint moved.
    ///
    /// # Errors
    ///
    /// Returns `RevalidatorError::ContentSourceUnavailable` if the source
    /// fails or times out; the state is not modified in that case.
    #[instrument(skip(self), fields(source = self.source.name()))]
    pub async fn force_refresh(&self) -> Result<ActivityStatus> {
        self.perform_check(true).await
    }

    async fn perform_check(&self, force: bool) -> Result<ActivityStatus> {
        let mut guard = self.inner.lock().await;
        let Tracked { state, failed_at } = &mut *guard;
        // Clamp so a clock stepping backwards cannot break ordering.
        let now = self.clock.now().max(state.last_check);
        let threshold = self.config.recheck_threshold;

        let due = force
            || state.cached_fingerprint.is_none()
            || now.saturating_since(state.last_check) >= threshold;
        let recently_failed = failed_at.is_some_and(|at| now.saturating_since(at) < threshold);

        if due && !force && recently_failed {
            debug!("Source failed within re-check threshold; answering from cached state");
            return Ok(fallback_status(state, now));
        }

        let has_changes = if due {
            match self.fetch_fingerprint().await {
                Ok(fingerprint) => {
                    *failed_at = None;
                    let changed = state.cached_fingerprint.as_ref() != Some(&fingerprint);
                    if changed {
                        info!(
                            fingerprint = %fingerprint,
                            previous = ?state.cached_fingerprint.as_ref().map(Fingerprint::as_str),
                            forced = force,
                            "Content change detected"
                        );
                        state.last_change = now;
                        state.cached_fingerprint = Some(fingerprint);
                    }
                    state.last_check = now;
                    changed
                }
                Err(err) => {
                    // Stamped after the fetch so callers queued behind it fall inside the window.
                    *failed_at = Some(self.clock.now().max(now));
                    if force {
                        warn!(
                            error = %err,
                            timed_out = err.is_timeout(),
                            "Forced refresh failed; state unchanged"
                        );
                        return Err(RevalidatorError::content_source(self.source.name(), err));
                    }
                    warn!(
                        error = %err,
                        timed_out = err.is_timeout(),
                        "Content check failed; using cached state"
                    );
                    return Ok(fallback_status(state, now));
                }
            }
        } else {
            debug!("Within re-check threshold; answering from cached state");
            false
        };

        self.verify(state, now)?;

        let elapsed = now.saturating_since(state.last_change);
        let (next_interval, tier_reason) = self.config.backoff.interval_for(elapsed);
        state.last_interval = next_interval;

        let reason = if force {
            REASON_FORCED_REFRESH
        } else {
            tier_reason
        };

        Ok(ActivityStatus {
            has_changes,
            time_since_last_change: elapsed,
            next_interval,
            reason: reason.to_string(),
        })
    }

    async fn fetch_fingerprint(&self) -> std::result::Result<Fingerprint, ContentSourceError> {
        let timeout = self.config.fetch_timeout;
        match tokio::time::timeout(timeout, self.source.fingerprint()).await {
            Ok(result) => result,
            Err(_) => Err(ContentSourceError::Timeout(timeout)),
        }
    }

    fn verify(&self, state: &ActivityState, now: Timestamp) -> Result<()> {
        if state.is_consistent_at(now) {
            return Ok(());
        }
        error!(
            last_change = %state.last_change,
            last_check = %state.last_check,
            now = %now,
            "Activity state ordering violated"
        );
        Err(RevalidatorError::internal_state(format!(
            "expected last_change <= last_check <= now, got {} / {} / {}",
            state.last_change, state.last_check, now
        )))
    }
}

/// Status reported when the source cannot be read: the last interval
/// handed out, measured from the cached change time.
fn fallback_status(state: &ActivityState, now: Timestamp) -> ActivityStatus {
    ActivityStatus {
        has_changes: false,
        time_since_last_change: now.saturating_since(state.last_change),
        next_interval: state.last_interval,
        reason: REASON_CHECK_FAILED.to_string(),
    }
}
