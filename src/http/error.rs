//! Handler errors and their JSON rendering.

use std::any::Any;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::content::ValidationReport;
use crate::security::AdmissionError;

/// Errors returned by route handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("template data is invalid")]
    Invalid(ValidationReport),

    #[error("missing or invalid admin credentials")]
    Unauthorized,

    /// An admission rule that could only be enforced inside the handler,
    /// such as the body limit on a request without `Content-Length`.
    #[error(transparent)]
    Admission(#[from] AdmissionError),

    #[error("{0}")]
    Internal(String),
}

/// Error text the logging middleware attaches to the request's entry.
#[derive(Debug, Clone)]
pub struct LoggedError(pub String);

/// Marker left on a response whose handler failed unexpectedly.
///
/// The logging middleware picks it up, records the failure and replaces the
/// body with the generic 500 carrying the request ID.
#[derive(Debug, Clone)]
pub struct HandlerFailure {
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::NotFound(what) => (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": "Not Found", "message": format!("{what} not found") })),
            )
                .into_response(),
            ApiError::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "Bad Request", "message": message })),
            )
                .into_response(),
            ApiError::Invalid(report) => {
                (StatusCode::UNPROCESSABLE_ENTITY, Json(report)).into_response()
            }
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "Unauthorized", "message": "Missing or invalid admin credentials" })),
            )
                .into_response(),
            ApiError::Admission(rejection) => {
                let message = rejection.to_string();
                let mut response = rejection.into_response();
                response.extensions_mut().insert(LoggedError(message));
                response
            }
            ApiError::Internal(message) => {
                let mut response = internal_error_response(None, None);
                response.extensions_mut().insert(HandlerFailure { message });
                response
            }
        }
    }
}

/// Generic 500 body. `detail` is only passed in development.
pub fn internal_error_response(request_id: Option<&str>, detail: Option<&str>) -> Response {
    let mut body = json!({
        "error": "Internal Server Error",
        "message": detail.unwrap_or("An unexpected error occurred"),
    });
    if let Some(id) = request_id {
        body["requestId"] = json!(id);
    }
    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
}

/// Panic handler for `CatchPanicLayer`.
pub fn handle_panic(payload: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };
    ApiError::Internal(format!("handler panicked: {message}")).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_internal_error_carries_failure_marker() {
        let response = ApiError::Internal("db down".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let failure = response.extensions().get::<HandlerFailure>().unwrap();
        assert_eq!(failure.message, "db down");
    }

    #[test]
    fn test_panic_payloads() {
        let response = handle_panic(Box::new("boom"));
        let failure = response.extensions().get::<HandlerFailure>().unwrap();
        assert_eq!(failure.message, "handler panicked: boom");

        let response = handle_panic(Box::new(String::from("owned")));
        let failure = response.extensions().get::<HandlerFailure>().unwrap();
        assert_eq!(failure.message, "handler panicked: owned");
    }

    #[test]
    fn test_admission_error_keeps_status_and_log_text() {
        let response = ApiError::from(AdmissionError::PayloadTooLarge { size: None, max: 64 })
            .into_response();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let logged = response.extensions().get::<LoggedError>().unwrap();
        assert_eq!(logged.0, "Request size exceeds maximum allowed size");
        assert!(response.extensions().get::<HandlerFailure>().is_none());
    }

    #[test]
    fn test_not_found_status() {
        let response = ApiError::NotFound("template 'x'".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
