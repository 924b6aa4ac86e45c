/// `load_config` module: loads the optional YAML settings file and adapts it,
/// together with environment overrides, into the core [`PushConfig`].
///
/// # Responsibilities
/// - Parse a user-supplied YAML file into [`PushConfig`]; every key is
///   optional and falls back to the built-in default
/// - Apply environment overrides (`RESULTS_PUSH_BUCKET`, `RESULTS_PUSH_REGISTRY`)
/// - Expand a leading `~/` in path settings against `$HOME`
///
/// # Errors
/// All errors use `anyhow::Error` and are surfaced at the CLI boundary.
use anyhow::{Context, Result};
use results_push_core::config::PushConfig;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

pub const BUCKET_ENV: &str = "RESULTS_PUSH_BUCKET";
pub const REGISTRY_ENV: &str = "RESULTS_PUSH_REGISTRY";

/// Load settings from `path` if given, otherwise start from defaults.
pub fn load_config(path: Option<&Path>) -> Result<PushConfig> {
    let mut config = match path {
        Some(path) => read_config_file(path)?,
        None => {
            info!("No config file given, using built-in defaults");
            PushConfig::default()
        }
    };

    if let Some(bucket) = env::var(BUCKET_ENV).ok().filter(|v| !v.is_empty()) {
        info!(bucket_url = %bucket, "Bucket overridden from environment");
        config.bucket_url = bucket;
    }
    if let Some(registry) = env::var(REGISTRY_ENV).ok().filter(|v| !v.is_empty()) {
        info!(registry = %registry, "Registry path overridden from environment");
        config.registry = PathBuf::from(registry);
    }

    let home = env::var_os("HOME").map(PathBuf::from);
    let config = config.expand_home(home.as_deref());
    config.trace_loaded();
    Ok(config)
}

fn read_config_file(path: &Path) -> Result<PushConfig> {
    info!(config_path = ?path, "Loading configuration from file");

    let content = fs::read_to_string(path)
        .map_err(|e| {
            error!(error = ?e, config_path = ?path, "Failed to read config file");
            e
        })
        .with_context(|| format!("Failed to read config file {:?}", path))?;

    // An empty file is a valid "all defaults" config.
    if content.trim().is_empty() {
        return Ok(PushConfig::default());
    }

    serde_yaml::from_str(&content)
        .map_err(|e| {
            error!(error = ?e, config_path = ?path, "Failed to parse config YAML");
            e
        })
        .with_context(|| format!("Failed to parse config YAML {:?}", path))
}
