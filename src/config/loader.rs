//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use crate::config::schema::{Environment, GuardConfig};
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable holding a comma-separated origin allow-list.
pub const ALLOWED_ORIGINS_ENV: &str = "ALLOWED_ORIGINS";

/// Environment variable selecting `development` or `production`.
pub const APP_ENV: &str = "APP_ENV";

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file, then apply
/// environment overrides.
pub fn load_config(path: &Path) -> Result<GuardConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: GuardConfig = toml::from_str(&content)?;
    finalize(config)
}

/// Build the configuration from defaults plus environment overrides.
pub fn load_from_env() -> Result<GuardConfig, ConfigError> {
    finalize(GuardConfig::default())
}

fn finalize(mut config: GuardConfig) -> Result<GuardConfig, ConfigError> {
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Apply environment overrides using the given lookup.
pub fn apply_env_overrides<F>(config: &mut GuardConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(raw) = lookup(ALLOWED_ORIGINS_ENV) {
        let origins = parse_origins(&raw);
        if !origins.is_empty() {
            config.security.allowed_origins = origins;
        }
    }

    if let Some(raw) = lookup(APP_ENV) {
        match Environment::parse(&raw) {
            Some(env) => config.environment = env,
            None => tracing::warn!(value = %raw, "Ignoring unknown {}", APP_ENV),
        }
    }
}

/// Split a comma-separated origin list, trimming blanks and trailing slashes.
pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|o| o.trim().trim_end_matches('/'))
        .filter(|o| !o.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_parse_origins() {
        assert_eq!(
            parse_origins(" https://shop.example.com/, http://localhost:3000 ,,"),
            vec!["https://shop.example.com", "http://localhost:3000"]
        );
        assert!(parse_origins(" , ").is_empty());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ALLOWED_ORIGINS_ENV, "https://a.example,https://b.example"),
            (APP_ENV, "production"),
        ]);
        let mut config = GuardConfig::default();
        apply_env_overrides(&mut config, |k| env.get(k).map(|v| v.to_string()));

        assert_eq!(
            config.security.allowed_origins,
            vec!["https://a.example", "https://b.example"]
        );
        assert_eq!(config.environment, Environment::Production);
    }

    #[test]
    fn test_parse_toml_with_partial_sections() {
        let config: GuardConfig = toml::from_str(
            r#"
            environment = "production"

            [security]
            window_ms = 1000
            max_requests = 5
            require_auth = true

            [logging]
            file_enabled = false
            "#,
        )
        .unwrap();

        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.security.window_ms, 1000);
        assert_eq!(config.security.max_requests, 5);
        assert!(config.security.require_auth);
        assert!(config.security.validate_input);
        assert_eq!(config.security.max_request_size, 10 * 1024 * 1024);
        assert!(!config.logging.file_enabled);
        assert_eq!(config.logging.dir, "logs");
    }
}
