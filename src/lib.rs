//! # revalidator
//!
//! Adaptive revalidation scheduling for statically generated sites.
//!
//! The crate tracks when the content behind a site last changed and
//! recommends how long a rendering runtime should wait before
//! regenerating its pages: short intervals while content is moving,
//! backing off to a capped maximum while it is quiet.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use revalidator::{build_router, ActivityManager, AppState, Config, DirectorySource};
//!
//! let source = Arc::new(DirectorySource::new("content/blog"));
//! let manager = Arc::new(ActivityManager::new(Config::default(), source)?);
//!
//! // Query directly...
//! let status = manager.get_activity_status().await?;
//!
//! // ...or expose GET/POST /api/revalidation-status
//! let app = build_router(AppState::new(manager));
//! ```
//!
//! ## Key Concepts
//!
//! ### Fingerprint
//!
//! A cheap, stable digest of the monitored content set. A
//! [`ContentSource`] produces one per check; the manager compares it with
//! the cached value to detect change.
//!
//! ### Backoff tier
//!
//! A bracket of quiet time mapped to a target interval. Tiers are
//! evaluated in ascending order; see [`BackoffPolicy`].
//!
//! ## Features
//!
//! - `http-source` - Enable [`source::HttpSource`] for CMS endpoints
//!
//! ## Thread Safety
//!
//! [`ActivityManager`] is `Send + Sync` and meant to be shared behind an
//! `Arc`. Check-and-update sequences are serialized by an internal lock.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_op_in_unsafe_fn)]

// ============================================================================
// Module declarations
// ============================================================================

mod clock;
mod config;
mod error;
mod types;

pub mod activity;
pub mod http;
pub mod scheduler;
pub mod source;

// ============================================================================
// Public API re-exports
// ============================================================================

// Activity tracking
pub use activity::{
    ActivityManager, ActivityState, ActivityStatus, BackoffPolicy, BackoffTier,
    REASON_CHECK_FAILED, REASON_FORCED_REFRESH,
};

// Configuration
pub use config::{Config, ServerConfig};

// Error handling
pub use error::{ContentSourceError, Result, RevalidatorError};

// Core types
pub use clock::{Clock, ManualClock, SystemClock};
pub use types::{Fingerprint, Timestamp};

// Content sources
pub use source::{ContentSource, DirectorySource, MemorySource};

// HTTP surface
pub use http::{build_router, AppState, RateLimitConfig};

// Scheduling
pub use scheduler::{RevalidationHook, RevalidationScheduler, SchedulerHandle, TracingHook};

// ============================================================================
// Prelude module for convenient imports
// ============================================================================

/// Convenient imports for common revalidator usage.
///
/// ```rust
/// use revalidator::prelude::*;
/// ```
pub mod prelude {
    pub use crate::activity::{ActivityManager, ActivityStatus};
    pub use crate::config::Config;
    pub use crate::error::{Result, RevalidatorError};
    pub use crate::source::{ContentSource, DirectorySource};
    pub use crate::types::{Fingerprint, Timestamp};
}
