//! Content source abstractions for the revalidator.
//!
//! A content source answers one question cheaply: "what is the current
//! fingerprint of the monitored content?" The activity manager compares
//! successive fingerprints to detect change.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    ActivityManager                           │
//! │                         │  (timeout-bounded)                 │
//! │                         ▼                                    │
//! │              ┌─────────────────────┐                        │
//! │              │   ContentSource     │  ← Trait               │
//! │              └─────────────────────┘                        │
//! │             ▲           ▲           ▲                       │
//! │   ┌─────────┴─────┐ ┌───┴────────┐ ┌┴───────────┐           │
//! │   │DirectorySource│ │MemorySource│ │ HttpSource │           │
//! │   └───────────────┘ └────────────┘ └────────────┘           │
//! │    (blog files)      (embedded)     (CMS, feature)          │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod directory;
mod memory;

#[cfg(feature = "http-source")]
mod http;

pub use directory::DirectorySource;
pub use memory::MemorySource;

#[cfg(feature = "http-source")]
pub use http::HttpSource;

use async_trait::async_trait;

use crate::error::ContentSourceError;
use crate::types::Fingerprint;

/// A queryable set of monitored content.
///
/// Implementations must be `Send + Sync`; the manager shares one source
/// across concurrent requests. Timeouts are applied by the caller, so an
/// implementation may block as long as its backend does.
///
/// # Implementing a Custom Source
///
/// ```rust,ignore
/// use async_trait::async_trait;
/// use revalidator::{ContentSource, ContentSourceError, Fingerprint};
///
/// struct VersionTable { db: MyDb }
///
/// #[async_trait]
/// impl ContentSource for VersionTable {
///     fn name(&self) -> &str {
///         "version-table"
///     }
///
///     async fn fingerprint(&self) -> Result<Fingerprint, ContentSourceError> {
///         let version = self.db.max_updated_at().await
///             .map_err(|e| ContentSourceError::unavailable(e.to_string()))?;
///         Ok(Fingerprint::new(version.to_string()))
///     }
/// }
/// ```
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Short identifier used in logs and error messages.
    fn name(&self) -> &str;

    /// Returns the fingerprint of the content as it is now.
    ///
    /// # Errors
    ///
    /// Returns a [`ContentSourceError`] if the backend cannot be read.
    async fn fingerprint(&self) -> Result<Fingerprint, ContentSourceError>;
}
