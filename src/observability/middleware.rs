//! Request logging middleware.
//!
//! Wraps every admitted request: `log_request` on the way in,
//! `log_response` on the way out. A response marked with
//! [`HandlerFailure`] is additionally recorded through `log_error` and
//! replaced by the generic 500 body carrying the request ID. A
//! [`LoggedError`] marker only supplies the entry's error text.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use serde_json::json;

use crate::http::error::{internal_error_response, HandlerFailure, LoggedError};
use crate::http::request::RequestInfo;
use crate::observability::{metrics, request_log::RequestLogger};

/// State for the logging middleware.
#[derive(Debug, Clone)]
pub struct RequestLogState {
    pub logger: Arc<RequestLogger>,
    /// Surface failure messages to callers (development only).
    pub expose_errors: bool,
}

pub async fn request_logging_middleware(
    State(state): State<RequestLogState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let info = RequestInfo::from_request(&request);
    let request_id = state.logger.log_request(&info);
    let start = Instant::now();

    let mut response = next.run(request).await;
    let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

    match response.extensions_mut().remove::<HandlerFailure>() {
        Some(failure) => {
            let status = response.status().as_u16();
            state
                .logger
                .log_response(&request_id, status, duration_ms, Some(failure.message.clone()));
            state.logger.log_error(
                &request_id,
                &failure.message,
                Some(json!({
                    "method": info.method,
                    "url": info.url,
                    "durationMs": duration_ms,
                })),
            );

            let detail = state.expose_errors.then_some(failure.message.as_str());
            response = internal_error_response(Some(&request_id), detail);
        }
        None => {
            let error = response
                .extensions_mut()
                .remove::<LoggedError>()
                .map(|LoggedError(message)| message);
            state
                .logger
                .log_response(&request_id, response.status().as_u16(), duration_ms, error);
        }
    }

    metrics::record_request(response.status().as_u16(), start);
    response
}
