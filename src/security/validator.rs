//! Request admission decision.
//!
//! Checks run in a fixed order and the first failure wins:
//!
//! 1. rate limit on the client fingerprint (429)
//! 2. origin allow-list, only when an `Origin` header is sent (403)
//! 3. declared `Content-Length` against the size cap (413)
//! 4. credential presence when auth is required (401)
//! 5. suspicious-input screen of path and query (400)
//!
//! Every rejection is written to the request log before it is returned.

use std::sync::Arc;

use axum::http::Request;

use crate::config::SecurityConfig;
use crate::http::request::RequestInfo;
use crate::observability::{metrics, request_log::RequestLogger};
use crate::security::error::AdmissionError;
use crate::security::patterns;
use crate::security::rate_limit::{now_millis, RateDecision, RateLimitPolicy, RateLimiter};

/// Composes the admission checks over shared limiter and logger instances.
#[derive(Debug)]
pub struct SecurityValidator {
    config: SecurityConfig,
    policy: RateLimitPolicy,
    limiter: Arc<RateLimiter>,
    logger: Arc<RequestLogger>,
}

impl SecurityValidator {
    pub fn new(config: SecurityConfig, limiter: Arc<RateLimiter>, logger: Arc<RequestLogger>) -> Self {
        let policy = config.rate_limit_policy();
        Self {
            config,
            policy,
            limiter,
            logger,
        }
    }

    pub fn config(&self) -> &SecurityConfig {
        &self.config
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Decide whether `request` may reach a handler.
    pub fn validate_request<B>(&self, request: &Request<B>) -> Result<RateDecision, AdmissionError> {
        self.validate(&RequestInfo::from_request(request))
    }

    /// [`validate_request`](Self::validate_request) on an extracted snapshot.
    pub fn validate(&self, info: &RequestInfo) -> Result<RateDecision, AdmissionError> {
        self.validate_at(info, now_millis())
    }

    /// Admission against an explicit clock (epoch milliseconds).
    pub fn validate_at(&self, info: &RequestInfo, now_ms: u64) -> Result<RateDecision, AdmissionError> {
        self.evaluate(info, now_ms).inspect_err(|rejection| {
            self.record_rejection(info, rejection);
        })
    }

    fn evaluate(&self, info: &RequestInfo, now_ms: u64) -> Result<RateDecision, AdmissionError> {
        let decision = self.limiter.check_at(&info.fingerprint(), &self.policy, now_ms);
        if !decision.allowed {
            return Err(AdmissionError::RateLimitExceeded {
                limit: decision.limit,
                reset_at: decision.reset_at,
                retry_after_secs: decision.retry_after_secs(now_ms),
            });
        }

        if let Some(origin) = &info.origin {
            if !self.origin_allowed(origin) {
                return Err(AdmissionError::InvalidOrigin {
                    origin: origin.clone(),
                });
            }
        }

        if let Some(size) = info.content_length {
            if size > self.config.max_request_size {
                return Err(AdmissionError::PayloadTooLarge {
                    size: Some(size),
                    max: self.config.max_request_size,
                });
            }
        }

        if self.config.require_auth && !info.has_credentials() {
            return Err(AdmissionError::Unauthenticated);
        }

        if self.config.validate_input
            && patterns::is_suspicious_target(&info.path, info.query.as_deref())
        {
            return Err(AdmissionError::SuspiciousInput);
        }

        Ok(decision)
    }

    fn origin_allowed(&self, origin: &str) -> bool {
        let origin = origin.trim_end_matches('/');
        self.config
            .allowed_origins
            .iter()
            .any(|allowed| allowed == "*" || allowed.trim_end_matches('/') == origin)
    }

    fn record_rejection(&self, info: &RequestInfo, rejection: &AdmissionError) {
        let status = rejection.status().as_u16();
        tracing::warn!(
            request_id = ?info.request_id,
            client = %info.client_ip,
            method = %info.method,
            url = %info.url,
            status,
            reason = rejection.reason(),
            "Request rejected"
        );
        metrics::record_rejection(rejection.reason());
        self.logger.log_rejection(
            info,
            status,
            &rejection.to_string(),
            Some(rejection.metadata()),
        );
    }
}
