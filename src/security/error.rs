//! Admission rejections and their HTTP rendering.

use axum::{
    http::{HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Map, Value};

pub const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
pub const X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// Why a request was refused admission.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdmissionError {
    /// Recoverable after `Retry-After`.
    #[error("Rate limit exceeded. Try again later.")]
    RateLimitExceeded {
        limit: u32,
        /// Epoch milliseconds.
        reset_at: u64,
        retry_after_secs: u64,
    },

    #[error("Origin not allowed")]
    InvalidOrigin { origin: String },

    /// `size` is the declared `Content-Length`; `None` when the body was
    /// streamed past the limit without one.
    #[error("Request size exceeds maximum allowed size")]
    PayloadTooLarge { size: Option<u64>, max: u64 },

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Request contains potentially malicious content")]
    SuspiciousInput,
}

impl AdmissionError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::InvalidOrigin { .. } => StatusCode::FORBIDDEN,
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::SuspiciousInput => StatusCode::BAD_REQUEST,
        }
    }

    /// Short title used as the `error` field of the body.
    pub fn title(&self) -> &'static str {
        match self {
            Self::RateLimitExceeded { .. } => "Too Many Requests",
            Self::InvalidOrigin { .. } => "Forbidden",
            Self::PayloadTooLarge { .. } => "Payload Too Large",
            Self::Unauthenticated => "Unauthorized",
            Self::SuspiciousInput => "Bad Request",
        }
    }

    /// Metric and log label.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::RateLimitExceeded { .. } => "rate_limit",
            Self::InvalidOrigin { .. } => "origin",
            Self::PayloadTooLarge { .. } => "payload_size",
            Self::Unauthenticated => "auth",
            Self::SuspiciousInput => "suspicious_input",
        }
    }

    /// Context written alongside the rejection in the request log.
    pub fn metadata(&self) -> Value {
        let mut meta = json!({ "reason": self.reason() });
        match self {
            Self::RateLimitExceeded {
                limit,
                reset_at,
                retry_after_secs,
            } => {
                meta["limit"] = json!(limit);
                meta["resetAt"] = json!(reset_at);
                meta["retryAfter"] = json!(retry_after_secs);
            }
            Self::InvalidOrigin { origin } => meta["origin"] = json!(origin),
            Self::PayloadTooLarge { size, max } => {
                if let Some(size) = size {
                    meta["size"] = json!(size);
                }
                meta["maxSize"] = json!(max);
            }
            Self::Unauthenticated | Self::SuspiciousInput => {}
        }
        meta
    }

    fn body(&self) -> Value {
        let mut body = Map::new();
        body.insert("error".into(), json!(self.title()));
        body.insert("message".into(), json!(self.to_string()));
        match self {
            Self::RateLimitExceeded {
                retry_after_secs, ..
            } => {
                body.insert("retryAfter".into(), json!(retry_after_secs));
            }
            Self::PayloadTooLarge { max, .. } => {
                body.insert("maxSize".into(), json!(max));
            }
            _ => {}
        }
        Value::Object(body)
    }
}

impl IntoResponse for AdmissionError {
    fn into_response(self) -> Response {
        let mut response = (self.status(), Json(self.body())).into_response();

        if let Self::RateLimitExceeded {
            limit,
            reset_at,
            retry_after_secs,
        } = self
        {
            let headers = response.headers_mut();
            headers.insert(axum::http::header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
            headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(limit));
            headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(0u32));
            headers.insert(X_RATELIMIT_RESET, HeaderValue::from(reset_at / 1000));
        }

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_response_headers() {
        let response = AdmissionError::RateLimitExceeded {
            limit: 10,
            reset_at: 1_700_000_060_000,
            retry_after_secs: 60,
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        let headers = response.headers();
        assert_eq!(headers["retry-after"], "60");
        assert_eq!(headers["x-ratelimit-limit"], "10");
        assert_eq!(headers["x-ratelimit-remaining"], "0");
        assert_eq!(headers["x-ratelimit-reset"], "1700000060");
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AdmissionError::InvalidOrigin { origin: "x".into() }.status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AdmissionError::PayloadTooLarge { size: Some(2), max: 1 }.status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(AdmissionError::Unauthenticated.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AdmissionError::SuspiciousInput.status(), StatusCode::BAD_REQUEST);
    }
}
