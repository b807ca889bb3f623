//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ProxyConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable holding the upstream base URL.
pub const ENV_TARGET_URL: &str = "TARGET_URL";
/// Environment variable toggling URL rewriting.
pub const ENV_ENABLE_URL_REWRITING: &str = "ENABLE_URL_REWRITING";

/// Error type for configuration loading.
#[derive(Debug, Error)]
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
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse a TOML configuration file. Missing fields take their defaults.
pub fn read_config_file(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Build the startup configuration: defaults, then the optional file, then
/// the process environment. Validated once, after every layer is applied.
pub fn load(path: Option<&Path>) -> Result<ProxyConfig, ConfigError> {
    load_with(path, |key| std::env::var(key).ok())
}

/// [`load`] with an explicit environment lookup.
pub fn load_with<F>(path: Option<&Path>, lookup: F) -> Result<ProxyConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match path {
        Some(path) => read_config_file(path)?,
        None => ProxyConfig::default(),
    };

    apply_env_overrides(&mut config, lookup);
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Apply `TARGET_URL` and `ENABLE_URL_REWRITING` on top of `config`.
///
/// Rewriting is enabled only when the variable reads `true` in any case.
pub fn apply_env_overrides<F>(config: &mut ProxyConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup(ENV_TARGET_URL) {
        config.upstream.target_url = url;
    }
    if let Some(flag) = lookup(ENV_ENABLE_URL_REWRITING) {
        config.rewrite.enabled = flag.trim().eq_ignore_ascii_case("true");
    }
}
