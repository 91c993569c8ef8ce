//! Configuration types for the revalidator.
//!
//! [`Config`] controls the activity manager:
//! - Minimum re-check threshold (guards the content source from hammering)
//! - Content-source fetch timeout
//! - Backoff policy tiers and interval cap
//!
//! [`ServerConfig`] adds what the `revalidator` binary needs on top and
//! can be read from `REVALIDATOR_*` environment variables.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use revalidator::Config;
//!
//! let config = Config {
//!     recheck_threshold: Duration::from_secs(10),
//!     ..Default::default()
//! };
//! assert!(config.validate().is_ok());
//! ```

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::activity::BackoffPolicy;
use crate::error::{Result, RevalidatorError};
use crate::http::RateLimitConfig;

/// Activity manager configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Minimum time between two content-source checks on the lazy path.
    ///
    /// Status queries arriving sooner are answered from cached state.
    /// Default: 60 s
    pub recheck_threshold: Duration,

    /// Upper bound on a single fingerprint fetch.
    ///
    /// A fetch that runs longer counts as a failed check.
    /// Default: 5 s
    pub fetch_timeout: Duration,

    /// Tiers mapping quiet time to a revalidation interval.
    pub backoff: BackoffPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            recheck_threshold: Duration::from_secs(60),
            fetch_timeout: Duration::from_secs(5),
            backoff: BackoffPolicy::default(),
        }
    }
}

impl Config {
    /// Creates a Config with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates the configuration.
    ///
    /// Called automatically by `ActivityManager::new()`.
    ///
    /// # Errors
    /// Returns `RevalidatorError::Config` if:
    /// - `recheck_threshold` or `fetch_timeout` is 0
    /// - the backoff policy is invalid (see [`BackoffPolicy::validate`])
    pub fn validate(&self) -> Result<()> {
        if self.recheck_threshold.is_zero() {
            return Err(RevalidatorError::config(
                "recheck_threshold must be greater than 0",
            ));
        }
        if self.fetch_timeout.is_zero() {
            return Err(RevalidatorError::config(
                "fetch_timeout must be greater than 0",
            ));
        }
        self.backoff.validate()
    }
}

/// Settings for the `revalidator` server binary.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Socket address the HTTP listener binds.
    pub bind_addr: SocketAddr,

    /// Root of the file-based content collection.
    pub content_dir: PathBuf,

    /// File extensions (without dot) that count as content.
    pub content_extensions: Vec<String>,

    /// Remote content endpoint; takes precedence over `content_dir`
    /// when the `http-source` feature is enabled.
    pub content_url: Option<String>,

    /// Token bucket applied to the API routes.
    pub rate_limit: RateLimitConfig,

    /// Run the background revalidation scheduler.
    pub scheduler_enabled: bool,

    /// Emit JSON log lines instead of the human-readable format.
    pub log_json: bool,

    /// Activity manager settings.
    pub manager: Config,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            content_dir: PathBuf::from("content"),
            content_extensions: default_extensions(),
            content_url: None,
            rate_limit: RateLimitConfig::default(),
            scheduler_enabled: false,
            log_json: false,
            manager: Config::default(),
        }
    }
}

/// Content extensions watched by default (blog posts and data files).
pub fn default_extensions() -> Vec<String> {
    ["md", "mdx", "json", "yaml", "yml"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl ServerConfig {
    /// Reads the configuration from `REVALIDATOR_*` environment variables.
    ///
    /// Missing or unparsable values keep their defaults:
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `REVALIDATOR_BIND_ADDR` | `127.0.0.1:3000` |
    /// | `REVALIDATOR_CONTENT_DIR` | `content` |
    /// | `REVALIDATOR_CONTENT_EXTENSIONS` | `md,mdx,json,yaml,yml` |
    /// | `REVALIDATOR_CONTENT_URL` | unset |
    /// | `REVALIDATOR_RECHECK_MS` | `60000` |
    /// | `REVALIDATOR_FETCH_TIMEOUT_MS` | `5000` |
    /// | `REVALIDATOR_RATE_LIMIT_CAPACITY` | `30` |
    /// | `REVALIDATOR_RATE_LIMIT_REFILL_PER_SEC` | `0.5` |
    /// | `REVALIDATOR_SCHEDULER` | `false` |
    /// | `REVALIDATOR_LOG_JSON` | `false` |
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let extensions = env::var("REVALIDATOR_CONTENT_EXTENSIONS")
            .ok()
            .map(|raw| {
                raw.split(',')
                    .map(|ext| ext.trim().trim_start_matches('.').to_ascii_lowercase())
                    .filter(|ext| !ext.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|exts| !exts.is_empty())
            .unwrap_or(defaults.content_extensions);

        Self {
            bind_addr: env::var("REVALIDATOR_BIND_ADDR")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.bind_addr),
            content_dir: env::var("REVALIDATOR_CONTENT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.content_dir),
            content_extensions: extensions,
            content_url: env::var("REVALIDATOR_CONTENT_URL")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            rate_limit: RateLimitConfig {
                capacity: env_f64(
                    "REVALIDATOR_RATE_LIMIT_CAPACITY",
                    defaults.rate_limit.capacity,
                ),
                refill_per_sec: env_f64(
                    "REVALIDATOR_RATE_LIMIT_REFILL_PER_SEC",
                    defaults.rate_limit.refill_per_sec,
                ),
            },
            scheduler_enabled: env_bool("REVALIDATOR_SCHEDULER", defaults.scheduler_enabled),
            log_json: env_bool("REVALIDATOR_LOG_JSON", defaults.log_json),
            manager: Config {
                recheck_threshold: env_duration_ms(
                    "REVALIDATOR_RECHECK_MS",
                    defaults.manager.recheck_threshold,
                ),
                fetch_timeout: env_duration_ms(
                    "REVALIDATOR_FETCH_TIMEOUT_MS",
                    defaults.manager.fetch_timeout,
                ),
                backoff: defaults.manager.backoff,
            },
        }
    }

    /// Validates the server and manager settings.
    pub fn validate(&self) -> Result<()> {
        if self.content_extensions.is_empty() {
            return Err(RevalidatorError::config(
                "content_extensions must not be empty",
            ));
        }
        self.rate_limit.validate()?;
        self.manager.validate()
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw {
        "1" | "true" | "TRUE" | "yes" | "YES" => Some(true),
        "0" | "false" | "FALSE" | "no" | "NO" => Some(false),
        _ => None,
    }
}

fn env_bool(name: &str, default: bool) -> bool {
    env::var(name)
        .ok()
        .and_then(|v| parse_bool(&v))
        .unwrap_or(default)
}

fn env_f64(name: &str, default: f64) -> f64 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<f64>().ok())
        .unwrap_or(default)
}

fn env_duration_ms(name: &str, default: Duration) -> Duration {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(default)
}
