//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Every request:
//!     → request_log.rs (in-memory entries + NDJSON file records)
//!     → middleware.rs (entry/exit around the handler)
//!     → metrics.rs (counters, histograms)
//!
//! All subsystems:
//!     → logging.rs (tracing subscriber, structured events)
//! ```
//!
//! # Design Decisions
//! - Request ID flows from the edge layer into every log record
//! - File writes happen off the request path on a single writer task
//! - Metrics are cheap (no-op until a recorder is installed)

pub mod logging;
pub mod metrics;
pub mod middleware;
pub mod request_log;

pub use request_log::{LogEntry, RequestLogger};
