//! In-process content source.

use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use super::ContentSource;
use crate::error::ContentSourceError;
use crate::types::Fingerprint;

#[derive(Debug)]
struct MemoryInner {
    fingerprint: Fingerprint,
    failure: Option<String>,
    delay: Duration,
    fetches: u64,
}

/// Content source backed by a value held in memory.
///
/// Useful when the host application already knows its content version
/// (e.g. after a CMS webhook) and for exercising the manager: the
/// fingerprint can be replaced, the source can be made to fail, and
/// responses can be delayed past the fetch timeout.
#[derive(Debug)]
pub struct MemorySource {
    name: String,
    inner: Mutex<MemoryInner>,
}

impl MemorySource {
    /// Creates a source reporting `marker` as its fingerprint.
    pub fn new(name: impl Into<String>, marker: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inner: Mutex::new(MemoryInner {
                fingerprint: Fingerprint::new(marker),
                failure: None,
                delay: Duration::ZERO,
                fetches: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MemoryInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Replaces the reported fingerprint.
    pub fn set(&self, marker: impl Into<String>) {
        self.lock().fingerprint = Fingerprint::new(marker);
    }

    /// Makes every following fetch fail with `reason`.
    pub fn fail_with(&self, reason: impl Into<String>) {
        self.lock().failure = Some(reason.into());
    }

    /// Clears a failure set by [`fail_with`](Self::fail_with).
    pub fn recover(&self) {
        self.lock().failure = None;
    }

    /// Delays every following fetch by `delay`.
    pub fn set_delay(&self, delay: Duration) {
        self.lock().delay = delay;
    }

    /// Number of fetches attempted so far (including failed ones).
    pub fn fetch_count(&self) -> u64 {
        self.lock().fetches
    }
}

#[async_trait]
impl ContentSource for MemorySource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fingerprint(&self) -> Result<Fingerprint, ContentSourceError> {
        let (delay, outcome) = {
            let mut inner = self.lock();
            inner.fetches += 1;
            let outcome = match &inner.failure {
                Some(reason) => Err(ContentSourceError::unavailable(reason.clone())),
                None => Ok(inner.fingerprint.clone()),
            };
            (inner.delay, outcome)
        };

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        outcome
    }
}
