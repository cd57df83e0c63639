//! Configuration validation.
//!
//! Returns every semantic error found, not just the first. Serde already
//! handled the syntactic side.

use std::net::SocketAddr;

use crate::config::schema::{GuardConfig, PLACEHOLDER_ADMIN_KEY};

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {reason}")]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: String,
}

impl ValidationError {
    fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

/// Validate a loaded configuration.
pub fn validate_config(config: &GuardConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    let security = &config.security;
    if security.window_ms == 0 {
        errors.push(ValidationError::new("security.window_ms", "must be greater than 0"));
    }
    if security.max_requests == 0 {
        errors.push(ValidationError::new("security.max_requests", "must be greater than 0"));
    }
    if security.max_request_size == 0 {
        errors.push(ValidationError::new(
            "security.max_request_size",
            "must be greater than 0",
        ));
    }
    if security.allowed_origins.iter().any(|o| o.trim().is_empty()) {
        errors.push(ValidationError::new(
            "security.allowed_origins",
            "must not contain empty entries",
        ));
    }

    if config.logging.max_entries == 0 {
        errors.push(ValidationError::new("logging.max_entries", "must be greater than 0"));
    }
    if config.logging.queue_capacity == 0 {
        errors.push(ValidationError::new("logging.queue_capacity", "must be greater than 0"));
    }
    if config.logging.file_enabled && config.logging.file_name.trim().is_empty() {
        errors.push(ValidationError::new("logging.file_name", "must not be empty"));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }

    if config.admin.enabled && config.admin.api_key.trim().is_empty() {
        errors.push(ValidationError::new("admin.api_key", "must not be empty"));
    }
    if config.admin.enabled && config.admin.api_key == PLACEHOLDER_ADMIN_KEY {
        errors.push(ValidationError::new(
            "admin.api_key",
            "placeholder key is not allowed when admin is enabled",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
