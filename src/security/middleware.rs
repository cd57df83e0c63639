//! Admission middleware.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::security::error::{X_RATELIMIT_LIMIT, X_RATELIMIT_REMAINING};
use crate::security::validator::SecurityValidator;

/// Middleware function running every admission check before the handler.
pub async fn admission_middleware(
    State(validator): State<Arc<SecurityValidator>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let mut response = match validator.validate_request(&request) {
        Ok(decision) => {
            let mut response = next.run(request).await;
            let headers = response.headers_mut();
            headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(decision.limit));
            headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(decision.remaining));
            response
        }
        Err(rejection) => rejection.into_response(),
    };

    if validator.config().enable_headers {
        apply_security_headers(&mut response);
    }
    response
}

/// Add hardening headers unless the handler already set them.
pub fn apply_security_headers(response: &mut Response) {
    let headers = response.headers_mut();
    headers
        .entry(header::X_CONTENT_TYPE_OPTIONS)
        .or_insert(HeaderValue::from_static("nosniff"));
    headers
        .entry(header::X_FRAME_OPTIONS)
        .or_insert(HeaderValue::from_static("DENY"));
    headers
        .entry(header::REFERRER_POLICY)
        .or_insert(HeaderValue::from_static("strict-origin-when-cross-origin"));
}
