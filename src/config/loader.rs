// Configuration loader
// Loads ~/.warden/config.toml, then applies environment overrides

use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use super::settings::Config;
use crate::errors::config_parse_error;

pub const ENV_ENGINE_URL: &str = "WARDEN_ENGINE_URL";
pub const ENV_MODEL: &str = "WARDEN_MODEL";
pub const ENV_HOME: &str = "WARDEN_HOME";

/// Location of the config file
pub fn config_path() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".warden/config.toml"))
}

/// Load configuration from the config file and environment
pub fn load_config() -> Result<Config> {
    let mut config = load_config_from(&config_path()?)?;
    apply_overrides(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

/// Parse the config file at `path`; a missing file yields the defaults
pub fn load_config_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        tracing::debug!("No config file at {}, using defaults", path.display());
        return Ok(Config::default());
    }

    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str(&contents).map_err(|e| anyhow!(config_parse_error(&e.to_string())))
}

/// Apply environment overrides, looked up through `lookup`
pub fn apply_overrides<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(url) = get(ENV_ENGINE_URL) {
        config.engine.base_url = url;
    }
    if let Some(model) = get(ENV_MODEL) {
        config.engine.model = model;
    }
    if let Some(home) = get(ENV_HOME) {
        config.home = Some(PathBuf::from(home));
    }
}
