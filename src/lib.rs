//! Storefront admission and request logging service.

pub mod admin;
pub mod config;
pub mod content;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use config::GuardConfig;
pub use http::HttpServer;
pub use lifecycle::{Shutdown, ShutdownSignal};
