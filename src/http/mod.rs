//! HTTP surface for the activity manager.
//!
//! | Method | Path | Success | Failure |
//! |--------|------|---------|---------|
//! | `GET`  | `/api/revalidation-status` | 200 status envelope | 500 `Failed to get revalidation status` |
//! | `POST` | `/api/revalidation-status` | 200 message envelope | 500 `Failed to refresh cache` |
//! | `GET`  | `/healthz` | 200 `ok` | — |
//!
//! API routes sit behind a per-client token bucket; an exhausted bucket
//! answers 429 with a `retry-after` header. Every handler converts manager
//! errors into a JSON envelope, so no fault escapes as a bare response.

mod envelope;
mod rate_limit;

pub use rate_limit::RateLimitConfig;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use tracing::{error, info, warn};

use crate::activity::ActivityManager;
use envelope::{error_response, MessageEnvelope, StatusEnvelope};
use rate_limit::RateLimiter;

/// Route serving status queries and forced refreshes.
pub const STATUS_PATH: &str = "/api/revalidation-status";

/// Message returned by a successful `POST`.
pub const REFRESH_MESSAGE: &str = "Cache refreshed successfully";

const GET_FAILED: &str = "Failed to get revalidation status";
const REFRESH_FAILED: &str = "Failed to refresh cache";
const RATE_LIMITED: &str = "Too many requests";

/// Shared handler state: the manager plus the API rate limiter.
#[derive(Clone)]
pub struct AppState {
    manager: Arc<ActivityManager>,
    limiter: Arc<RateLimiter>,
    rate_limit: RateLimitConfig,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("manager", &self.manager)
            .field("rate_limit", &self.rate_limit)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Creates state with the default rate limit.
    pub fn new(manager: Arc<ActivityManager>) -> Self {
        Self::with_rate_limit(manager, RateLimitConfig::default())
    }

    /// Creates state with a custom rate limit.
    pub fn with_rate_limit(manager: Arc<ActivityManager>, rate_limit: RateLimitConfig) -> Self {
        Self {
            manager,
            limiter: Arc::new(RateLimiter::new()),
            rate_limit,
        }
    }

    /// The manager behind the routes.
    pub fn manager(&self) -> &Arc<ActivityManager> {
        &self.manager
    }
}

/// Builds the router. Serve it with
/// `into_make_service_with_connect_info::<SocketAddr>()` so the rate
/// limiter can key on the peer address.
pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .route(STATUS_PATH, get(get_status).post(force_refresh))
        .route_layer(middleware::from_fn_with_state(state.clone(), limit_requests));

    Router::new()
        .route("/healthz", get(healthz))
        .merge(api)
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn get_status(State(state): State<AppState>) -> Response {
    match state.manager.get_activity_status().await {
        Ok(status) => (StatusCode::OK, Json(StatusEnvelope::new(&status))).into_response(),
        Err(err) => {
            error!(error = %err, "Revalidation status query failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, GET_FAILED)
        }
    }
}

async fn force_refresh(State(state): State<AppState>) -> Response {
    match state.manager.force_refresh().await {
        Ok(status) => {
            info!(
                has_changes = status.has_changes,
                next_interval_secs = status.next_interval.as_secs(),
                "Forced revalidation refresh"
            );
            (StatusCode::OK, Json(MessageEnvelope::new(REFRESH_MESSAGE))).into_response()
        }
        Err(err) => {
            error!(error = %err, "Forced revalidation refresh failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, REFRESH_FAILED)
        }
    }
}

async fn limit_requests(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let key = client_key(&req);
    if !state.limiter.allow(&key, &state.rate_limit).await {
        warn!(client = %key, path = %req.uri().path(), "Rate limit exceeded");
        return error_response(StatusCode::TOO_MANY_REQUESTS, RATE_LIMITED);
    }
    next.run(req).await
}

/// First `x-forwarded-for` hop, else the peer IP, else `unknown`.
fn client_key(req: &Request) -> String {
    if let Some(forwarded) = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        return forwarded.to_string();
    }
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request(headers: &[(&str, &str)]) -> Request {
        let mut builder = axum::http::Request::builder().uri(STATUS_PATH);
        for (k, v) in headers {
            builder = builder.header(*k, *v);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn test_client_key_prefers_forwarded_for() {
        let req = request(&[("x-forwarded-for", "203.0.113.7, 10.0.0.1")]);
        assert_eq!(client_key(&req), "203.0.113.7");
    }

    #[test]
    fn test_client_key_uses_connect_info() {
        let mut req = request(&[]);
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([192, 0, 2, 1], 5555))));
        assert_eq!(client_key(&req), "192.0.2.1");
    }

    #[test]
    fn test_client_key_fallback() {
        let req = request(&[("x-forwarded-for", " ")]);
        assert_eq!(client_key(&req), "unknown");
    }
}
