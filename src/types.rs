//! Core type definitions for revalidator timestamps and content fingerprints.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::time::Duration;

/// Unix timestamp in milliseconds.
///
/// Using i64 allows representing dates far into the future and past.
/// Millisecond precision matches the status endpoint's `timeSinceLastChange`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    /// Creates a timestamp for the current moment.
    ///
    /// If the system clock is before the Unix epoch (should never happen
    /// in practice), returns a timestamp of 0 (epoch) rather than panicking.
    #[inline]
    pub fn now() -> Self {
        use std::time::{SystemTime, UNIX_EPOCH};
        let duration = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Self(duration.as_millis() as i64)
    }

    /// Creates a timestamp from Unix milliseconds.
    #[inline]
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Returns the timestamp as Unix milliseconds.
    #[inline]
    pub const fn as_millis(&self) -> i64 {
        self.0
    }

    /// Returns the elapsed time from `earlier` to `self`.
    ///
    /// Clamps to zero when `earlier` is actually later.
    #[inline]
    pub fn saturating_since(&self, earlier: Timestamp) -> Duration {
        let delta = self.0.saturating_sub(earlier.0).max(0);
        Duration::from_millis(delta as u64)
    }

    /// Returns this timestamp shifted forward by `duration`.
    #[inline]
    pub fn saturating_add(&self, duration: Duration) -> Self {
        Self(self.0.saturating_add(duration.as_millis() as i64))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque digest of a monitored content set.
///
/// Two fingerprints are compared for equality only; their contents carry
/// no ordering. Sources may produce them from a SHA-256 digest, an HTTP
/// `ETag`, or any other stable version marker.
///
/// # Example
/// ```
/// use revalidator::Fingerprint;
///
/// let a = Fingerprint::digest(b"hello");
/// let b = Fingerprint::digest(b"hello");
/// assert_eq!(a, b);
/// assert_eq!(a.as_str().len(), 64);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Wraps an existing version marker (e.g. an `ETag`).
    pub fn new(marker: impl Into<String>) -> Self {
        Self(marker.into())
    }

    /// Computes the lowercase hex SHA-256 digest of `bytes`.
    pub fn digest(bytes: impl AsRef<[u8]>) -> Self {
        Self(hex::encode(Sha256::digest(bytes.as_ref())))
    }

    /// Returns the marker as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
