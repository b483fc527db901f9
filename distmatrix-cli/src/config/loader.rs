//! Config file discovery and loading

use anyhow::{Context, Result};
use std::path::PathBuf;

use super::Config;

/// Location of the config file (~/.config/distmatrix-cli/config.toml on Linux)
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("distmatrix-cli")
        .join("config.toml")
}

/// Load configuration from the config file (if present) and the environment.
///
/// A `.env` file in the working directory is read first so that
/// `DISTMATRIX_API_BASE_URL` can be supplied per deployment.
pub fn load_config() -> Result<Config> {
    if let Ok(path) = dotenvy::dotenv() {
        log::debug!("Loaded environment from {}", path.display());
    }

    let path = config_path();
    let mut config = if path.exists() {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str::<Config>(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?
    } else {
        log::debug!("No config file at {}, using defaults", path.display());
        Config::default()
    };

    config.apply_env();
    Ok(config)
}

/// Write the default configuration to the config path.
/// Refuses to overwrite an existing file unless `force` is set.
pub fn write_default_config(force: bool) -> Result<PathBuf> {
    let path = config_path();
    if path.exists() && !force {
        anyhow::bail!(
            "Config file already exists: {} (use --force to overwrite)",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
    }

    let content =
        toml::to_string_pretty(&Config::default()).context("Failed to serialize default config")?;
    std::fs::write(&path, content)
        .with_context(|| format!("Failed to write config file: {}", path.display()))?;

    log::info!("Wrote default config to {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_path_is_namespaced() {
        let path = config_path();
        assert!(path.ends_with("distmatrix-cli/config.toml"));
    }

    #[test]
    fn test_default_config_serializes_and_parses_back() {
        let text = toml::to_string_pretty(&Config::default()).unwrap();
        assert!(text.contains("base_url"));
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.ingest.max_file_size_mb, 16);
    }
}
