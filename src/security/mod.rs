//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → validator.rs (ordered admission checks)
//!         → rate_limit.rs (fixed window per client fingerprint)
//!         → patterns.rs (suspicious path/query screen)
//!     → rejection: error.rs renders JSON + headers, request log records it
//!     → admitted: handler, with sanitize.rs escaping JSON bodies
//! ```
//!
//! # Design Decisions
//! - Fail closed: first failing check ends the request
//! - Credentials are checked for presence, never for validity
//! - Counters are process-local; no cross-instance coordination

pub mod error;
pub mod middleware;
pub mod patterns;
pub mod rate_limit;
pub mod sanitize;
pub mod validator;

pub use error::AdmissionError;
pub use rate_limit::{RateDecision, RateLimitPolicy, RateLimiter};
pub use sanitize::{sanitize_input, SanitizedJson};
pub use validator::SecurityValidator;
