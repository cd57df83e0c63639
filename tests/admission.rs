//! End-to-end admission behaviour through the full middleware stack.

mod common;

use axum::{body::Body, http::Request, http::StatusCode};
use serde_json::json;

use common::{app, get, header, send, test_config};

#[tokio::test]
async fn test_plain_get_is_admitted() {
    let (router, state) = app(test_config());

    let (status, headers, body) = send(&router, get("/api/templates")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 5);
    assert!(header(&headers, "x-request-id").starts_with("req_"));
    assert_eq!(header(&headers, "x-ratelimit-limit"), "100");
    assert_eq!(header(&headers, "x-ratelimit-remaining"), "99");
    assert_eq!(header(&headers, "x-content-type-options"), "nosniff");
    assert_eq!(header(&headers, "x-frame-options"), "DENY");

    let logs = state.logger.logs();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].request_id, header(&headers, "x-request-id"));
    assert_eq!(logs[0].status_code, Some(200));
    assert!(logs[0].error.is_none());
}

#[tokio::test]
async fn test_client_request_id_is_kept_beside_generated_id() {
    let (router, state) = app(test_config());

    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "client-supplied-id")
        .body(Body::empty())
        .unwrap();
    let (status, headers, _) = send(&router, request).await;

    assert_eq!(status, StatusCode::OK);
    let request_id = header(&headers, "x-request-id");
    assert!(request_id.starts_with("req_"));
    assert_eq!(header(&headers, "x-client-request-id"), "client-supplied-id");
    assert!(state.logger.logs_by_request_id("client-supplied-id").is_empty());

    let logs = state.logger.logs_by_request_id(request_id);
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].client_request_id.as_deref(), Some("client-supplied-id"));
}

#[tokio::test]
async fn test_repeated_client_request_id_keeps_entries_apart() {
    let mut config = test_config();
    config.security.max_requests = 2;
    let (router, state) = app(config);

    let with_dup = || {
        Request::builder()
            .uri("/health")
            .header("x-request-id", "dup")
            .body(Body::empty())
            .unwrap()
    };
    let (first_status, first, _) = send(&router, with_dup()).await;
    let (second_status, second, _) = send(&router, with_dup()).await;
    let (third_status, third, _) = send(&router, with_dup()).await;

    assert_eq!(first_status, StatusCode::OK);
    assert_eq!(second_status, StatusCode::OK);
    assert_eq!(third_status, StatusCode::TOO_MANY_REQUESTS);

    let ids = [
        header(&first, "x-request-id"),
        header(&second, "x-request-id"),
        header(&third, "x-request-id"),
    ];
    assert_ne!(ids[0], ids[1]);
    assert_ne!(ids[1], ids[2]);
    assert!(state.logger.logs_by_request_id("dup").is_empty());

    for (id, status) in ids.iter().zip([200, 200, 429]) {
        let logs = state.logger.logs_by_request_id(id);
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].status_code, Some(status));
        assert_eq!(logs[0].client_request_id.as_deref(), Some("dup"));
    }
}

#[tokio::test]
async fn test_oversized_request_is_rejected_with_single_log_entry() {
    let (router, state) = app(test_config());

    let request = Request::builder()
        .method("POST")
        .uri("/api/templates/course-template/validate")
        .header("content-type", "application/json")
        .header("content-length", "20000000")
        .body(Body::from("{}"))
        .unwrap();
    let (status, headers, body) = send(&router, request).await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["error"], "Payload Too Large");
    assert_eq!(body["message"], "Request size exceeds maximum allowed size");
    assert_eq!(body["maxSize"], json!(10 * 1024 * 1024));

    let logs = state.logger.logs();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].request_id, header(&headers, "x-request-id"));
    assert_eq!(logs[0].status_code, Some(413));
    assert_eq!(
        logs[0].error.as_deref(),
        Some("Request size exceeds maximum allowed size")
    );
}

#[tokio::test]
async fn test_streamed_body_over_limit_is_413() {
    let mut config = test_config();
    config.security.max_request_size = 64;
    let (router, state) = app(config);

    let body = json!({ "title": "x".repeat(500) }).to_string();
    let request = Request::builder()
        .method("POST")
        .uri("/api/templates/course-template/validate")
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap();
    assert!(request.headers().get("content-length").is_none());

    let (status, headers, body) = send(&router, request).await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["error"], "Payload Too Large");
    assert_eq!(body["message"], "Request size exceeds maximum allowed size");
    assert_eq!(body["maxSize"], 64);

    let logs = state.logger.logs_by_request_id(header(&headers, "x-request-id"));
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].status_code, Some(413));
    assert_eq!(
        logs[0].error.as_deref(),
        Some("Request size exceeds maximum allowed size")
    );
}

#[tokio::test]
async fn test_rate_limit_exhaustion_returns_429_with_headers() {
    let mut config = test_config();
    config.security.max_requests = 3;
    let (router, state) = app(config);

    for remaining in ["2", "1", "0"] {
        let (status, headers, _) = send(&router, get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(header(&headers, "x-ratelimit-remaining"), remaining);
    }

    let (status, headers, body) = send(&router, get("/health")).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"], "Too Many Requests");
    assert_eq!(body["message"], "Rate limit exceeded. Try again later.");
    assert_eq!(header(&headers, "x-ratelimit-limit"), "3");
    assert_eq!(header(&headers, "x-ratelimit-remaining"), "0");

    let retry_after: u64 = header(&headers, "retry-after").parse().unwrap();
    assert!((1..=900).contains(&retry_after));
    let reset: i64 = header(&headers, "x-ratelimit-reset").parse().unwrap();
    assert!(reset >= chrono::Utc::now().timestamp());

    let rejected: Vec<_> = state
        .logger
        .logs()
        .into_iter()
        .filter(|entry| entry.status_code == Some(429))
        .collect();
    assert_eq!(rejected.len(), 1);
}

#[tokio::test]
async fn test_rate_limit_precedes_origin_check() {
    let mut config = test_config();
    config.security.max_requests = 1;
    let (router, _) = app(config);

    let (status, _, _) = send(&router, get("/health")).await;
    assert_eq!(status, StatusCode::OK);

    let request = Request::builder()
        .uri("/health")
        .header("origin", "https://evil.example")
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = send(&router, request).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_clients_are_limited_independently() {
    let mut config = test_config();
    config.security.max_requests = 1;
    let (router, _) = app(config);

    let from = |ip: &str| {
        Request::builder()
            .uri("/health")
            .header("x-forwarded-for", ip)
            .body(Body::empty())
            .unwrap()
    };

    assert_eq!(send(&router, from("10.0.0.1")).await.0, StatusCode::OK);
    assert_eq!(send(&router, from("10.0.0.1")).await.0, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(send(&router, from("10.0.0.2")).await.0, StatusCode::OK);
}

#[tokio::test]
async fn test_disallowed_origin_is_forbidden() {
    let (router, state) = app(test_config());

    let request = Request::builder()
        .uri("/api/templates")
        .header("origin", "https://evil.example")
        .body(Body::empty())
        .unwrap();
    let (status, _, body) = send(&router, request).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Origin not allowed");
    assert_eq!(state.logger.logs()[0].status_code, Some(403));

    let request = Request::builder()
        .uri("/api/templates")
        .header("origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&router, request).await.0, StatusCode::OK);
}

#[tokio::test]
async fn test_required_auth_accepts_bearer_or_session_cookie() {
    let mut config = test_config();
    config.security.require_auth = true;
    let (router, _) = app(config);

    let (status, _, body) = send(&router, get("/health")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Authentication required");

    let request = Request::builder()
        .uri("/health")
        .header("authorization", "Bearer abc.def.ghi")
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&router, request).await.0, StatusCode::OK);

    let request = Request::builder()
        .uri("/health")
        .header("cookie", "theme=dark; session_id=s-123")
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&router, request).await.0, StatusCode::OK);
}

#[tokio::test]
async fn test_suspicious_urls_are_rejected() {
    let (router, _) = app(test_config());

    for uri in [
        "/api/templates/../../etc/passwd",
        "/api/templates?type=1%20UNION%20SELECT%20password%20FROM%20users",
        "/api/templates?type=%3Cscript%3Ealert(1)%3C%2Fscript%3E",
    ] {
        let (status, _, body) = send(&router, get(uri)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body["message"], "Request contains potentially malicious content");
    }
}

#[tokio::test]
async fn test_input_screening_can_be_disabled() {
    let mut config = test_config();
    config.security.validate_input = false;
    let (router, _) = app(config);

    let (status, _, _) = send(&router, get("/health?q=1%20UNION%20SELECT%202")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_rejection_is_written_once_to_log_file() {
    let dir = std::env::temp_dir().join(format!("guard-admission-{}", fastrand::u64(..)));
    let mut config = test_config();
    config.logging.file_enabled = true;
    config.logging.dir = dir.display().to_string();
    config.security.max_request_size = 10;
    let (router, state) = app(config);

    let request = Request::builder()
        .method("POST")
        .uri("/api/templates/page-template/validate")
        .header("content-length", "11")
        .body(Body::from("{\"a\":\"bcd\"}"))
        .unwrap();
    assert_eq!(send(&router, request).await.0, StatusCode::PAYLOAD_TOO_LARGE);

    state.logger.flush().await;
    let contents = std::fs::read_to_string(dir.join("requests.log")).unwrap();
    let lines: Vec<serde_json::Value> = contents
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();

    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["type"], "error");
    assert_eq!(lines[0]["error"], "Request size exceeds maximum allowed size");
    assert_eq!(lines[0]["metadata"]["reason"], "payload_size");

    std::fs::remove_dir_all(&dir).ok();
}
