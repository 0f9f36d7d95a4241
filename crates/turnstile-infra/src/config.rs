//! Service configuration loader for Turnstile.
//!
//! Reads `turnstile.toml` (or the path given on the command line) into
//! [`ServiceConfig`], then applies `TURNSTILE_*` environment overrides.
//! Falls back to defaults when the file is missing or malformed.

use std::path::{Path, PathBuf};

use secrecy::SecretString;
use turnstile_types::config::ServiceConfig;

/// File looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "turnstile.toml";

/// Minimum token budget (safety floor).
const MIN_TOKEN_BUDGET: u32 = 256;

pub const ENV_UPSTREAM_URL: &str = "TURNSTILE_UPSTREAM_URL";
pub const ENV_API_KEY: &str = "TURNSTILE_API_KEY";
pub const ENV_ASSISTANT_NAME: &str = "TURNSTILE_ASSISTANT_NAME";
pub const ENV_TOKEN_BUDGET: &str = "TURNSTILE_TOKEN_BUDGET";
pub const ENV_MODEL: &str = "TURNSTILE_MODEL";

/// Load configuration: file (if any), then process environment, then floors.
pub async fn load_service_config(path: Option<&Path>) -> ServiceConfig {
    let explicit = path.is_some();
    let path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

    let mut config = read_config_file(&path, explicit).await;
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    enforce_floors(&mut config);
    config
}

/// Parse a TOML config file.
///
/// - If the file does not exist, returns [`ServiceConfig::default()`]
///   (logged at warn when the path was given explicitly).
/// - If the file exists but fails to parse, logs a warning and returns the default.
pub async fn read_config_file(path: &Path, explicit: bool) -> ServiceConfig {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            if explicit {
                tracing::warn!("Config file {} not found, using defaults", path.display());
            } else {
                tracing::debug!("No {} found, using defaults", path.display());
            }
            return ServiceConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", path.display());
            return ServiceConfig::default();
        }
    };

    match toml::from_str::<ServiceConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!("Failed to parse {}: {err}, using defaults", path.display());
            ServiceConfig::default()
        }
    }
}

/// Apply `TURNSTILE_*` overrides read through `lookup`.
///
/// Empty values are ignored. An unparseable token budget is ignored with a
/// warning.
pub fn apply_env_overrides<F>(config: &mut ServiceConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(url) = get(ENV_UPSTREAM_URL) {
        config.upstream_base_url = url;
    }
    if let Some(key) = get(ENV_API_KEY) {
        config.upstream_api_key = Some(SecretString::from(key));
    }
    if let Some(name) = get(ENV_ASSISTANT_NAME) {
        config.assistant_name = name;
    }
    if let Some(model) = get(ENV_MODEL) {
        config.model = Some(model);
    }
    if let Some(raw) = get(ENV_TOKEN_BUDGET) {
        match raw.trim().parse::<u32>() {
            Ok(budget) => config.token_budget = budget,
            Err(err) => {
                tracing::warn!("Ignoring {ENV_TOKEN_BUDGET}={raw:?}: {err}");
            }
        }
    }
}

/// Enforce minimums that keep the service usable.
pub fn enforce_floors(config: &mut ServiceConfig) {
    config.token_budget = config.token_budget.max(MIN_TOKEN_BUDGET);
    config.max_concurrent = config.max_concurrent.max(1);
    config.max_attempts = config.max_attempts.max(1);
}
