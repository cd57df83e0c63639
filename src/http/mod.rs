//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, layer stack)
//!     → request.rs (request ID, client identity, credentials)
//!     → [security admission] → [request log]
//!     → handlers.rs (content template API)
//!     → error.rs (JSON error bodies)
//!     → Send to client
//! ```

pub mod error;
pub mod handlers;
pub mod request;
pub mod server;

pub use error::ApiError;
pub use request::{RequestInfo, X_CLIENT_REQUEST_ID, X_REQUEST_ID};
pub use server::{api_routes, build_router, with_layers, AppState, HttpServer};
