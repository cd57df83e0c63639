//! Request inspection and request ID generation.
//!
//! # Responsibilities
//! - Generate the `x-request-id` for every request
//! - Keep a client-supplied ID as `x-client-request-id` for correlation
//! - Capture the request metadata admission and logging both need
//! - Resolve the client address behind forwarding proxies
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - Credentials are only checked for presence here, never decoded

use std::net::SocketAddr;

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{header, HeaderMap, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use tower_http::request_id::{MakeRequestId, RequestId};

use crate::observability::request_log::RequestLogger;

/// Header carrying the request ID in both directions.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Request ID the client sent, moved aside so it never keys the log.
pub const X_CLIENT_REQUEST_ID: &str = "x-client-request-id";

/// Cookie names recognised as a session credential.
pub const SESSION_COOKIES: &[&str] = &["session_id", "sessionId", "session"];

/// Generates request IDs in the request logger's format.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeGuardRequestId;

impl MakeRequestId for MakeGuardRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&RequestLogger::generate_request_id())
            .ok()
            .map(RequestId::new)
    }
}

/// Move an incoming `x-request-id` to `x-client-request-id`.
///
/// Runs before `SetRequestIdLayer`, which then always generates the ID.
/// The client's value is echoed back under `x-client-request-id`.
pub async fn client_request_id_middleware(mut request: Request<Body>, next: Next) -> Response {
    let client_id = stash_client_request_id(&mut request);
    let mut response = next.run(request).await;
    if let Some(value) = client_id {
        response.headers_mut().insert(X_CLIENT_REQUEST_ID, value);
    }
    response
}

fn stash_client_request_id<B>(request: &mut Request<B>) -> Option<HeaderValue> {
    let value = request.headers_mut().remove(X_REQUEST_ID)?;
    request.headers_mut().insert(X_CLIENT_REQUEST_ID, value.clone());
    Some(value)
}

/// Snapshot of the request metadata used by admission and logging.
#[derive(Debug, Clone, Default)]
pub struct RequestInfo {
    pub request_id: Option<String>,
    pub client_request_id: Option<String>,
    pub method: String,
    /// Path and query as received.
    pub url: String,
    pub path: String,
    pub query: Option<String>,
    pub client_ip: String,
    pub user_agent: String,
    pub origin: Option<String>,
    pub content_length: Option<u64>,
    pub bearer_token: Option<String>,
    pub session_id: Option<String>,
}

impl RequestInfo {
    pub fn from_request<B>(request: &Request<B>) -> Self {
        let headers = request.headers();
        let uri = request.uri();
        let peer = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);

        Self {
            request_id: header_str(headers, X_REQUEST_ID).map(str::to_string),
            client_request_id: header_str(headers, X_CLIENT_REQUEST_ID).map(str::to_string),
            method: request.method().to_string(),
            url: uri
                .path_and_query()
                .map(|pq| pq.as_str().to_string())
                .unwrap_or_else(|| uri.path().to_string()),
            path: uri.path().to_string(),
            query: uri.query().map(str::to_string),
            client_ip: client_ip(headers, peer),
            user_agent: header_str(headers, header::USER_AGENT.as_str())
                .unwrap_or("unknown")
                .to_string(),
            origin: header_str(headers, header::ORIGIN.as_str()).map(str::to_string),
            content_length: header_str(headers, header::CONTENT_LENGTH.as_str())
                .and_then(|v| v.trim().parse().ok()),
            bearer_token: bearer_token(headers),
            session_id: session_cookie(headers),
        }
    }

    /// Rate limit key: client address plus user agent.
    pub fn fingerprint(&self) -> String {
        format!("{}:{}", self.client_ip, self.user_agent)
    }

    /// A bearer token or session cookie is present. Contents are not checked.
    pub fn has_credentials(&self) -> bool {
        self.bearer_token.is_some() || self.session_id.is_some()
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// First `X-Forwarded-For` hop, then `X-Real-IP`, then the socket peer.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    header_str(headers, "x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .or_else(|| header_str(headers, "x-real-ip").map(str::trim).filter(|v| !v.is_empty()))
        .map(str::to_string)
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

/// Token from `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = header_str(headers, header::AUTHORIZATION.as_str())?;
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then(|| token.to_string())
}

/// Value of the first recognised session cookie.
pub fn session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| SESSION_COOKIES.contains(name) && !value.is_empty())
        .map(|(_, value)| value.to_string())
}
