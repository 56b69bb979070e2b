//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Env(String),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Env(e) => write!(f, "Environment error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load configuration from an optional TOML file, apply environment
/// overrides, and validate.
///
/// When `path` is `None` the built-in defaults are the starting point.
pub fn load_config(path: Option<&Path>) -> Result<GatewayConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
            toml::from_str(&content).map_err(ConfigError::Parse)?
        }
        None => GatewayConfig::default(),
    };

    apply_env_overrides(&mut config)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    // Normalize: a trailing slash on the base would double up when the
    // inbound path is appended.
    while config.upstream.base_url.ends_with('/') {
        config.upstream.base_url.pop();
    }

    Ok(config)
}

/// Apply environment-variable overrides on top of the file/default config.
///
/// Secrets in particular are expected to arrive this way rather than
/// living in a config file on disk.
fn apply_env_overrides(config: &mut GatewayConfig) -> Result<(), ConfigError> {
    if let Ok(base) = std::env::var("UPSTREAM_API_BASE") {
        config.upstream.base_url = base;
    }
    if let Ok(key) = std::env::var("UPSTREAM_API_KEY") {
        config.upstream.api_key = Some(key);
    }
    if let Ok(key) = std::env::var("PROXY_API_KEY") {
        config.proxy_api_key = Some(key);
    }
    if let Ok(raw) = std::env::var("MAX_RETRIES") {
        config.retries.max_attempts = raw
            .parse()
            .map_err(|_| ConfigError::Env(format!("MAX_RETRIES is not a number: {:?}", raw)))?;
    }
    if let Ok(raw) = std::env::var("TIMEOUT_SECONDS") {
        config.upstream.timeout_secs = raw
            .parse()
            .map_err(|_| ConfigError::Env(format!("TIMEOUT_SECONDS is not a number: {:?}", raw)))?;
    }
    if let Ok(path) = std::env::var("AUDIT_DB_PATH") {
        config.audit.db_path = path;
    }
    Ok(())
}
