//! Integration tests for the revalidation-status HTTP contract.
//!
//! Starts a live server on an ephemeral port and speaks raw HTTP/1.1 to
//! it, so the assertions cover exactly what a client sees on the wire.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use revalidator::{
    build_router, ActivityManager, AppState, Config, ManualClock, MemorySource, RateLimitConfig,
    Timestamp,
};
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

const T0: Timestamp = Timestamp::from_millis(1_760_000_000_000);

struct TestServer {
    addr: SocketAddr,
    source: Arc<MemorySource>,
    clock: ManualClock,
}

async fn start_server(rate_limit: RateLimitConfig) -> TestServer {
    let source = Arc::new(MemorySource::new("cms", "v1"));
    let clock = ManualClock::new(T0);
    let manager = Arc::new(
        ActivityManager::with_clock(Config::default(), source.clone(), Arc::new(clock.clone()))
            .expect("manager"),
    );
    let app = build_router(AppState::with_rate_limit(manager, rate_limit));

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .expect("serve");
    });

    TestServer {
        addr,
        source,
        clock,
    }
}

fn generous() -> RateLimitConfig {
    RateLimitConfig {
        capacity: 1_000.0,
        refill_per_sec: 1_000.0,
    }
}

async fn send_raw(
    addr: SocketAddr,
    method: &str,
    path: &str,
    headers: &[(&str, &str)],
) -> (u16, String, String) {
    let mut stream = tokio::net::TcpStream::connect(addr)
        .await
        .expect("connect server");
    let mut req = format!("{method} {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n");
    if method == "POST" {
        req.push_str("Content-Length: 0\r\n");
    }
    for (k, v) in headers {
        req.push_str(&format!("{k}: {v}\r\n"));
    }
    req.push_str("\r\n");
    stream
        .write_all(req.as_bytes())
        .await
        .expect("write request");
    let mut response = String::new();
    stream
        .read_to_string(&mut response)
        .await
        .expect("read response");

    let (head, body) = response
        .split_once("\r\n\r\n")
        .expect("response has header/body separator");
    let status = head
        .split_whitespace()
        .nth(1)
        .and_then(|code| code.parse::<u16>().ok())
        .expect("status code");
    (status, head.to_ascii_lowercase(), body.to_string())
}

fn json(body: &str) -> Value {
    serde_json::from_str(body).expect("json body")
}

#[tokio::test]
async fn get_returns_status_envelope() {
    let server = start_server(generous()).await;
    let (status, head, body) = send_raw(server.addr, "GET", "/api/revalidation-status", &[]).await;

    assert_eq!(status, 200);
    assert!(head.contains("content-type: application/json"));
    let body = json(&body);
    assert_eq!(body["success"], true);
    assert_eq!(body["status"]["hasChanges"], true);
    assert_eq!(body["status"]["timeSinceLastChange"], 0);
    assert_eq!(body["status"]["timeSinceLastChangeHours"], "0.00");
    assert_eq!(body["status"]["nextInterval"], 300);
    assert_eq!(body["status"]["nextIntervalMinutes"], "5.0");
    assert_eq!(body["status"]["reason"], "recent activity");
    let ts = body["timestamp"].as_str().expect("timestamp string");
    assert!(chrono::DateTime::parse_from_rfc3339(ts).is_ok());
}

#[tokio::test]
async fn get_after_quiet_hours_backs_off() {
    let server = start_server(generous()).await;
    send_raw(server.addr, "GET", "/api/revalidation-status", &[]).await;

    server.clock.advance(Duration::from_secs(3 * 3600));
    let (status, _, body) = send_raw(server.addr, "GET", "/api/revalidation-status", &[]).await;
    assert_eq!(status, 200);
    let body = json(&body);
    assert_eq!(body["status"]["hasChanges"], false);
    assert_eq!(body["status"]["timeSinceLastChangeHours"], "3.00");
    assert_eq!(body["status"]["nextInterval"], 3600);
    assert_eq!(body["status"]["nextIntervalMinutes"], "60.0");
    assert_eq!(body["status"]["reason"], "quiet period - backing off");
}

#[tokio::test]
async fn post_refresh_then_get_resets_quiet_time() {
    let server = start_server(generous()).await;
    send_raw(server.addr, "GET", "/api/revalidation-status", &[]).await;
    server.clock.advance(Duration::from_secs(3 * 3600));
    server.source.set("v2");

    let (status, _, body) = send_raw(server.addr, "POST", "/api/revalidation-status", &[]).await;
    assert_eq!(status, 200);
    let body = json(&body);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Cache refreshed successfully");
    assert!(body["timestamp"].is_string());

    let (_, _, body) = send_raw(server.addr, "GET", "/api/revalidation-status", &[]).await;
    let body = json(&body);
    assert_eq!(body["status"]["timeSinceLastChange"], 0);
    assert_eq!(body["status"]["reason"], "recent activity");
}

#[tokio::test]
async fn get_survives_source_failure() {
    let server = start_server(generous()).await;
    server.source.fail_with("cms down");

    let (status, _, body) = send_raw(server.addr, "GET", "/api/revalidation-status", &[]).await;
    assert_eq!(status, 200);
    let body = json(&body);
    assert_eq!(body["success"], true);
    assert_eq!(body["status"]["reason"], "check failed, using cached state");
}

#[tokio::test]
async fn post_reports_source_failure_as_500() {
    let server = start_server(generous()).await;
    server.source.fail_with("cms down");

    let (status, _, body) = send_raw(server.addr, "POST", "/api/revalidation-status", &[]).await;
    assert_eq!(status, 500);
    assert_eq!(
        json(&body),
        serde_json::json!({"success": false, "error": "Failed to refresh cache"})
    );
}

#[tokio::test]
async fn api_is_rate_limited_per_client() {
    let server = start_server(RateLimitConfig {
        capacity: 2.0,
        refill_per_sec: 0.01,
    })
    .await;
    let client_a = [("x-forwarded-for", "198.51.100.1")];
    let client_b = [("x-forwarded-for", "198.51.100.2")];

    for _ in 0..2 {
        let (status, _, _) =
            send_raw(server.addr, "GET", "/api/revalidation-status", &client_a).await;
        assert_eq!(status, 200);
    }
    let (status, head, body) =
        send_raw(server.addr, "GET", "/api/revalidation-status", &client_a).await;
    assert_eq!(status, 429);
    assert!(head.contains("retry-after"));
    assert_eq!(json(&body)["error"], "Too many requests");

    let (status, _, _) = send_raw(server.addr, "POST", "/api/revalidation-status", &client_b).await;
    assert_eq!(status, 200);
}

#[tokio::test]
async fn healthz_is_not_rate_limited() {
    let server = start_server(RateLimitConfig {
        capacity: 1.0,
        refill_per_sec: 0.01,
    })
    .await;
    for _ in 0..3 {
        let (status, _, body) = send_raw(server.addr, "GET", "/healthz", &[]).await;
        assert_eq!(status, 200);
        assert_eq!(body, "ok");
    }
}

#[tokio::test]
async fn unsupported_method_is_rejected() {
    let server = start_server(generous()).await;
    let (status, _, _) = send_raw(server.addr, "DELETE", "/api/revalidation-status", &[]).await;
    assert_eq!(status, 405);
}
