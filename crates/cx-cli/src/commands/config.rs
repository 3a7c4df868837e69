//! Config command implementations

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::output::{print_error, print_info, print_success, print_warning};
use cx_core::config::{self, ClientConfig};

fn resolve(config_path: Option<&Path>) -> PathBuf {
    config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(config::default_config_path)
}

/// Load the client configuration
///
/// An explicit path must exist. Without one, the default location is used
/// when present and built-in defaults otherwise.
pub fn load_client_config(config_path: Option<&Path>) -> Result<ClientConfig> {
    if let Some(path) = config_path {
        return config::load_config(path)
            .with_context(|| format!("Failed to load config from {:?}", path));
    }

    let default_path = config::default_config_path();
    if default_path.exists() {
        Ok(config::load_config(&default_path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config from {:?}: {}", default_path, e);
            ClientConfig::default()
        }))
    } else {
        tracing::debug!("Using default configuration");
        Ok(ClientConfig::default())
    }
}

/// Print the effective configuration as TOML
pub fn config_show(config_path: Option<&Path>) -> Result<()> {
    let config = load_client_config(config_path)?;
    let content = toml::to_string_pretty(&config).context("Failed to serialize config")?;
    println!("{}", content.trim_end());
    Ok(())
}

/// Print the path the configuration is read from
pub fn config_path(config_path: Option<&Path>) {
    println!("{}", resolve(config_path).display());
}

/// Print one configuration value
pub fn config_get(config_path: Option<&Path>, key: &str) -> Result<()> {
    let config = load_client_config(config_path)?;
    let value = toml::Value::try_from(&config).context("Failed to serialize config")?;

    match value.get(key) {
        Some(toml::Value::String(s)) => println!("{}", s),
        Some(value) => println!("{}", value),
        None => print_error(&format!("Key not found: {}", key)),
    }
    Ok(())
}

/// Write a default configuration file
pub fn config_init(config_path: Option<&Path>, force: bool) -> Result<()> {
    let path = resolve(config_path);

    if path.exists() && !force {
        print_warning(&format!("Config file already exists: {:?}", path));
        print_info("Use --force to overwrite");
        return Ok(());
    }

    config::save_config(&path, &ClientConfig::default())
        .with_context(|| format!("Failed to write config to {:?}", path))?;
    print_success(&format!("Wrote default config to {:?}", path));
    Ok(())
}
