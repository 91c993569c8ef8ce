//! Error types for the revalidator.
//!
//! The revalidator uses a two-level error system:
//! - `RevalidatorError` is the top-level error returned by all public APIs
//! - `ContentSourceError` describes why a content-source query failed
//!
//! # Error Handling Pattern
//! ```rust,ignore
//! use revalidator::{ActivityManager, Config, Result};
//!
//! async fn example(manager: &ActivityManager) -> Result<()> {
//!     let status = manager.force_refresh().await?;
//!     println!("next check in {}s", status.next_interval.as_secs());
//!     Ok(())
//! }
//! ```

use std::time::Duration;
use thiserror::Error;

/// Result type alias for revalidator operations.
pub type Result<T> = std::result::Result<T, RevalidatorError>;

/// Top-level error enum for all revalidator operations.
#[derive(Debug, Error)]
pub enum RevalidatorError {
    /// The content source timed out or errored while an explicit fresh
    /// read was required.
    #[error("Content source '{source_name}' unavailable: {source}")]
    ContentSourceUnavailable {
        /// Name of the source that failed.
        source_name: String,
        /// Underlying failure.
        #[source]
        source: ContentSourceError,
    },

    /// Activity state was observed in an inconsistent shape.
    #[error("Internal state error: {0}")]
    InternalState(String),

    /// Configuration error.
    #[error("Configuration error: {reason}")]
    Config {
        /// Description of what's wrong with the configuration.
        reason: String,
    },
}

impl RevalidatorError {
    /// Creates a content-source-unavailable error.
    pub fn content_source(source_name: impl Into<String>, source: ContentSourceError) -> Self {
        Self::ContentSourceUnavailable {
            source_name: source_name.into(),
            source,
        }
    }

    /// Creates an internal state error with the given message.
    pub fn internal_state(msg: impl Into<String>) -> Self {
        Self::InternalState(msg.into())
    }

    /// Creates a configuration error with the given reason.
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }

    /// Returns true if this is a content-source failure.
    pub fn is_content_source_unavailable(&self) -> bool {
        matches!(self, Self::ContentSourceUnavailable { .. })
    }

    /// Returns true if this is an internal state error.
    pub fn is_internal_state(&self) -> bool {
        matches!(self, Self::InternalState(_))
    }

    /// Returns true if this is a configuration error.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config { .. })
    }
}

/// Failures reported by a [`ContentSource`](crate::source::ContentSource).
#[derive(Debug, Error)]
pub enum ContentSourceError {
    /// The query did not finish within the configured fetch timeout.
    #[error("fingerprint fetch timed out after {0:?}")]
    Timeout(Duration),

    /// Filesystem error while reading the content collection.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Remote endpoint failure (transport or non-success status).
    #[error("HTTP error: {0}")]
    Http(String),

    /// Source reported itself unavailable for any other reason.
    #[error("{0}")]
    Unavailable(String),
}

impl ContentSourceError {
    /// Creates an HTTP error with the given message.
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Creates a generic unavailability error.
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    /// Returns true if the failure was a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}
