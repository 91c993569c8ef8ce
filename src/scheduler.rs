//! Background revalidation loop.
//!
//! The activity manager is purely reactive. Hosts without their own
//! revalidation timer can run a [`RevalidationScheduler`], which queries
//! the manager, triggers a [`RevalidationHook`] whenever content changed,
//! and sleeps for the recommended interval.
//!
//! Changes are tracked by the manager's `last_change` rather than by the
//! `has_changes` flag, which only the caller whose check detected the
//! change gets to see. A change first noticed by an HTTP client is still
//! revalidated on the next tick.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::activity::{ActivityManager, ActivityStatus};
use crate::error::Result;
use crate::types::Timestamp;

/// Regenerates statically rendered pages after a content change.
#[async_trait]
pub trait RevalidationHook: Send + Sync {
    /// Called once per content change, whichever caller detected it.
    ///
    /// # Errors
    ///
    /// Errors are logged by the scheduler; they never stop the loop.
    async fn revalidate(&self, status: &ActivityStatus) -> Result<()>;
}

/// Hook that only records the revalidation in the log.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingHook;

#[async_trait]
impl RevalidationHook for TracingHook {
    async fn revalidate(&self, status: &ActivityStatus) -> Result<()> {
        info!(
            reason = %status.reason,
            next_interval_secs = status.next_interval.as_secs(),
            "Content changed; pages should be revalidated"
        );
        Ok(())
    }
}

/// Handle to a running scheduler task.
#[derive(Debug)]
pub struct SchedulerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<u64>,
}

impl SchedulerHandle {
    /// Stops the loop and waits for it to exit.
    ///
    /// Returns the number of revalidations the hook was asked to perform.
    pub async fn shutdown(self) -> u64 {
        // Receiver gone means the task already exited.
        let _ = self.shutdown.send(true);
        match self.task.await {
            Ok(count) => count,
            Err(err) => {
                error!(error = %err, "Revalidation scheduler task panicked");
                0
            }
        }
    }
}

/// Drives a [`RevalidationHook`] at the cadence the manager recommends.
pub struct RevalidationScheduler {
    manager: Arc<ActivityManager>,
    hook: Arc<dyn RevalidationHook>,
}

impl RevalidationScheduler {
    /// Creates a scheduler; nothing runs until [`spawn`](Self::spawn).
    pub fn new(manager: Arc<ActivityManager>, hook: Arc<dyn RevalidationHook>) -> Self {
        Self { manager, hook }
    }

    /// Starts the loop on the current tokio runtime.
    pub fn spawn(self) -> SchedulerHandle {
        let (shutdown, rx) = watch::channel(false);
        let task = tokio::spawn(self.run(rx));
        SchedulerHandle { shutdown, task }
    }

    async fn run(self, mut shutdown: watch::Receiver<bool>) -> u64 {
        info!(source = self.manager.source_name(), "Revalidation scheduler started");
        let mut revalidations = 0u64;
        let mut handled_change: Option<Timestamp> = None;

        loop {
            let wait = match self.manager.get_activity_status().await {
                Ok(status) => {
                    let state = self.manager.snapshot().await;
                    let unhandled = state.cached_fingerprint.is_some()
                        && handled_change != Some(state.last_change);
                    if status.has_changes || unhandled {
                        handled_change = Some(state.last_change);
                        revalidations += 1;
                        if let Err(err) = self.hook.revalidate(&status).await {
                            warn!(error = %err, "Revalidation hook failed");
                        }
                    }
                    debug!(
                        next_interval_secs = status.next_interval.as_secs(),
                        reason = %status.reason,
                        "Scheduler tick"
                    );
                    status.next_interval
                }
                Err(err) => {
                    error!(error = %err, "Status query failed in scheduler");
                    self.manager.config().backoff.shortest_interval()
                }
            };

            let signalled = tokio::time::timeout(wait, shutdown.changed()).await;
            match signalled {
                // Interval elapsed without a shutdown request.
                Err(_) => {}
                Ok(Ok(())) if !*shutdown.borrow() => {}
                Ok(_) => break,
            }
        }

        info!(revalidations, "Revalidation scheduler stopped");
        revalidations
    }
}
