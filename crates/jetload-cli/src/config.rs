//! Configuration loading and resolution.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use jetload::NetworkConfig;

const CONFIG_ENV: &str = "JETLOAD_CONFIG";
const LOCAL_CONFIG: &str = ".jetload.json";

/// Resolve the config file path: explicit flag, then `JETLOAD_CONFIG`, then
/// `./.jetload.json` if it exists.
pub fn resolve_config_path(explicit: Option<&str>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(PathBuf::from(path));
    }

    if let Ok(env_path) = std::env::var(CONFIG_ENV) {
        return Some(PathBuf::from(env_path));
    }

    let local = PathBuf::from(LOCAL_CONFIG);
    local.exists().then_some(local)
}

/// Build the effective config.
///
/// Precedence, lowest first: defaults, config file, `JETLOAD_*` variables,
/// `--base-url`.
pub fn load(path: Option<&Path>, base_url: Option<&str>) -> Result<NetworkConfig> {
    let config = match path {
        Some(path) => read_file(path)?,
        None => NetworkConfig::default(),
    };
    let mut config = config.with_env()?;

    if let Some(base) = base_url {
        config.base_url = base.to_string();
    }
    tracing::debug!(?config, "effective configuration");
    Ok(config)
}

fn read_file(path: &Path) -> Result<NetworkConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading config file {}", path.display()))?;
    NetworkConfig::from_json(&raw).with_context(|| format!("parsing {}", path.display()))
}
