//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML), optional
//!     → loader.rs (parse & deserialize, environment overrides)
//!     → validation.rs (semantic checks)
//!     → GuardConfig (validated, immutable)
//!     → shared by value/Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is fixed at construction; there is no runtime reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_from_env, ConfigError};
pub use schema::{
    AdminConfig, Environment, GuardConfig, ListenerConfig, LoggingConfig, ObservabilityConfig,
    SecurityConfig, TimeoutConfig,
};
