//! Shared utilities for integration testing.

use axum::{
    body::{to_bytes, Body},
    http::{HeaderMap, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use storefront_guard::config::GuardConfig;
use storefront_guard::http::{build_router, AppState};

pub const ADMIN_KEY: &str = "test-admin-key";

/// Defaults with the file sink disabled and the admin surface enabled
/// under a known key.
pub fn test_config() -> GuardConfig {
    let mut config = GuardConfig::default();
    config.logging.file_enabled = false;
    config.admin.enabled = true;
    config.admin.api_key = ADMIN_KEY.to_string();
    config
}

/// A fully layered router plus the state it shares with the test.
#[allow(dead_code)]
pub fn app(config: GuardConfig) -> (Router, AppState) {
    let state = AppState::new(config);
    (build_router(state.clone()), state)
}

/// Send one request through `router` and decode the JSON body.
///
/// Non-JSON bodies come back as `Value::Null`.
#[allow(dead_code)]
pub async fn send(router: &Router, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, headers, body)
}

#[allow(dead_code)]
pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[allow(dead_code)]
pub fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[allow(dead_code)]
pub fn header<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .unwrap_or_else(|| panic!("missing header {name}"))
        .to_str()
        .unwrap()
}
