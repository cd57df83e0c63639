//! HTML escaping of parsed request bodies.

use axum::{
    extract::{rejection::JsonRejection, FromRef, FromRequest, Request},
    http::StatusCode,
    Json,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

use crate::http::error::ApiError;
use crate::observability::metrics;
use crate::security::error::AdmissionError;
use crate::security::validator::SecurityValidator;

/// Recursively HTML-escape every string inside `value`.
///
/// Arrays and objects are walked; numbers, booleans and null pass through.
/// Escaping is single pass: an existing `&lt;` becomes `&amp;lt;`.
pub fn sanitize_input(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(escape_html(&s)),
        Value::Array(items) => Value::Array(items.into_iter().map(sanitize_input).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, sanitize_input(v)))
                .collect(),
        ),
        other => other,
    }
}

/// Escape the HTML-significant characters of `input`.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            '/' => out.push_str("&#x2F;"),
            _ => out.push(c),
        }
    }
    out
}

/// JSON body extractor keeping the body as submitted next to its
/// sanitized form.
///
/// Validation rules measure `raw`; `value` is what may be stored or echoed.
/// Sanitization follows the `validate_input` setting of the validator in
/// state.
#[derive(Debug)]
pub struct SanitizedJson<T> {
    pub raw: Value,
    pub value: T,
}

impl<S, T> FromRequest<S> for SanitizedJson<T>
where
    Arc<SecurityValidator>: FromRef<S>,
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let validator = Arc::<SecurityValidator>::from_ref(state);
        let Json(raw) = Json::<Value>::from_request(req, state)
            .await
            .map_err(|e| body_rejection(e, validator.config().max_request_size))?;

        let sanitized = if validator.config().validate_input {
            sanitize_input(raw.clone())
        } else {
            raw.clone()
        };

        let value = serde_json::from_value(sanitized)
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;
        Ok(Self { raw, value })
    }
}

/// A body that overran the limit while streaming is still a 413.
fn body_rejection(rejection: JsonRejection, max: u64) -> ApiError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        tracing::warn!(max_size = max, "Request body exceeded limit without Content-Length");
        metrics::record_rejection("payload_size");
        ApiError::Admission(AdmissionError::PayloadTooLarge { size: None, max })
    } else {
        ApiError::BadRequest(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_escapes_nested_strings() {
        let input = json!({
            "title": "<b>Yoga</b> & \"Breath\"",
            "tags": ["it's", "a/b", 3, true, null],
            "meta": { "note": "<script>" }
        });

        let out = sanitize_input(input);
        assert_eq!(
            out,
            json!({
                "title": "&lt;b&gt;Yoga&lt;&#x2F;b&gt; &amp; &quot;Breath&quot;",
                "tags": ["it&#x27;s", "a&#x2F;b", 3, true, null],
                "meta": { "note": "&lt;script&gt;" }
            })
        );
    }

    #[test]
    fn test_escaping_is_single_pass() {
        assert_eq!(escape_html("&lt;"), "&amp;lt;");
        assert_eq!(
            sanitize_input(json!("<")),
            json!("&lt;"),
        );
    }

    #[test]
    fn test_plain_text_untouched() {
        assert_eq!(sanitize_input(json!("Sanskrit 101")), json!("Sanskrit 101"));
        assert_eq!(sanitize_input(json!(42.5)), json!(42.5));
    }
}
