//! JSON envelopes returned by the revalidation-status endpoint.
//!
//! Every response carries `success`; successful bodies add `status` or
//! `message` plus a `timestamp`, failures add `error`.

use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use crate::activity::ActivityStatus;

/// Status fields as rendered on the wire.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusBody {
    pub has_changes: bool,
    /// Milliseconds.
    pub time_since_last_change: u64,
    /// Hours, two decimals.
    pub time_since_last_change_hours: String,
    /// Seconds.
    pub next_interval: u64,
    /// Minutes, one decimal.
    pub next_interval_minutes: String,
    pub reason: String,
}

impl From<&ActivityStatus> for StatusBody {
    fn from(status: &ActivityStatus) -> Self {
        Self {
            has_changes: status.has_changes,
            time_since_last_change: status.time_since_last_change.as_millis() as u64,
            time_since_last_change_hours: format!("{:.2}", status.hours_since_last_change()),
            next_interval: status.next_interval.as_secs(),
            next_interval_minutes: format!("{:.1}", status.next_interval_minutes()),
            reason: status.reason.clone(),
        }
    }
}

/// `GET` success body.
#[derive(Debug, Serialize)]
pub struct StatusEnvelope {
    pub success: bool,
    pub status: StatusBody,
    pub timestamp: String,
}

impl StatusEnvelope {
    pub fn new(status: &ActivityStatus) -> Self {
        Self {
            success: true,
            status: status.into(),
            timestamp: iso_now(),
        }
    }
}

/// `POST` success body.
#[derive(Debug, Serialize)]
pub struct MessageEnvelope {
    pub success: bool,
    pub message: String,
    pub timestamp: String,
}

impl MessageEnvelope {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            timestamp: iso_now(),
        }
    }
}

/// Failure body for any route.
#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub success: bool,
    pub error: String,
}

impl ErrorEnvelope {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}

/// Current UTC time in RFC 3339 with millisecond precision and a `Z` suffix.
pub(crate) fn iso_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[must_use]
pub(crate) fn error_response(status: StatusCode, message: &str) -> Response {
    let mut resp = (status, Json(ErrorEnvelope::new(message))).into_response();
    if status == StatusCode::TOO_MANY_REQUESTS {
        resp.headers_mut()
            .insert("retry-after", HeaderValue::from_static("2"));
    }
    resp
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn status(since: Duration, interval: Duration) -> ActivityStatus {
        ActivityStatus {
            has_changes: false,
            time_since_last_change: since,
            next_interval: interval,
            reason: "quiet period - backing off".to_string(),
        }
    }

    #[test]
    fn test_status_body_formatting() {
        let body = StatusBody::from(&status(
            Duration::from_millis(10_800_000),
            Duration::from_secs(3600),
        ));
        assert_eq!(body.time_since_last_change, 10_800_000);
        assert_eq!(body.time_since_last_change_hours, "3.00");
        assert_eq!(body.next_interval, 3600);
        assert_eq!(body.next_interval_minutes, "60.0");
    }

    #[test]
    fn test_fractional_rounding() {
        let body = StatusBody::from(&status(
            Duration::from_millis(600_000),
            Duration::from_secs(90),
        ));
        assert_eq!(body.time_since_last_change_hours, "0.17");
        assert_eq!(body.next_interval_minutes, "1.5");
    }

    #[test]
    fn test_envelope_shape() {
        let envelope = StatusEnvelope::new(&status(Duration::ZERO, Duration::from_secs(300)));
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["status"]["hasChanges"], false);
        assert_eq!(json["status"]["timeSinceLastChangeHours"], "0.00");
        assert_eq!(json["status"]["nextIntervalMinutes"], "5.0");
        assert!(json["timestamp"].as_str().unwrap().ends_with('Z'));
    }

    #[test]
    fn test_error_envelope_shape() {
        let json = serde_json::to_value(ErrorEnvelope::new("boom")).unwrap();
        assert_eq!(json, serde_json::json!({"success": false, "error": "boom"}));
    }

    #[test]
    fn test_iso_now_parses() {
        let ts = iso_now();
        assert!(chrono::DateTime::parse_from_rfc3339(&ts).is_ok());
    }
}
